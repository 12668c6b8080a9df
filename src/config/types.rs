use serde::Deserialize;

/// Main configuration structure for geoharvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
}

/// Document store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Batch partitioning and supervision configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    /// First batch group id run by this process (group ids start at 1)
    #[serde(rename = "first-group", default = "default_first_group")]
    pub first_group: u32,

    /// Number of batch groups run in parallel by this process
    #[serde(rename = "group-count", default = "default_group_count")]
    pub group_count: u32,

    /// Records per batch window
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: u32,

    /// Chunk width: tasks launched concurrently per batch group
    #[serde(rename = "scrap-batch-size", default = "default_scrap_batch_size")]
    pub scrap_batch_size: u32,

    /// Pause before re-running a crashed pass (seconds)
    #[serde(rename = "restart-delay-secs", default = "default_restart_delay")]
    pub restart_delay_secs: u64,
}

/// Resource monitor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Interval between CPU samples (seconds)
    #[serde(rename = "sample-interval-secs", default = "default_sample_interval")]
    pub sample_interval_secs: u64,

    /// Utilization above which new chunks are held back
    #[serde(rename = "throttle-cpu-percent", default = "default_throttle_cpu")]
    pub throttle_cpu_percent: f32,

    /// Utilization above which sustained load is fatal
    #[serde(rename = "critical-cpu-percent", default = "default_critical_cpu")]
    pub critical_cpu_percent: f32,

    /// How long utilization must stay critical before the process exits (seconds)
    #[serde(rename = "overload-dwell-secs", default = "default_overload_dwell")]
    pub overload_dwell_secs: u64,

    /// How long a throttled scheduler sleeps before re-checking (seconds)
    #[serde(rename = "cooldown-secs", default = "default_cooldown")]
    pub cooldown_secs: u64,
}

/// Crawl task configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// Search page URL template with {query}, {lat} and {long} placeholders
    #[serde(rename = "search-url-template", default = "default_search_url_template")]
    pub search_url_template: String,

    /// Selector matching place links on a search result page
    #[serde(rename = "place-link-selector", default = "default_place_link_selector")]
    pub place_link_selector: String,

    /// Prefix a discovered href must carry to count as a place URL
    #[serde(rename = "place-url-prefix", default = "default_place_url_prefix")]
    pub place_url_prefix: String,

    /// Selector for the scrollable result container
    #[serde(
        rename = "results-container-selector",
        default = "default_results_container"
    )]
    pub results_container_selector: String,

    /// Hard ceiling for loading a search page (seconds)
    #[serde(rename = "navigation-timeout-secs", default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,

    /// Hard ceiling for loading a place detail page (seconds)
    #[serde(rename = "detail-timeout-secs", default = "default_detail_timeout")]
    pub detail_timeout_secs: u64,

    /// Delay between growth polls while stabilizing the result list (milliseconds)
    #[serde(rename = "scroll-poll-interval-ms", default = "default_scroll_poll_interval")]
    pub scroll_poll_interval_ms: u64,

    /// Consecutive no-growth polls required before the list counts as stable
    #[serde(rename = "stable-polls", default = "default_stable_polls")]
    pub stable_polls: u32,
}

fn default_first_group() -> u32 {
    1
}

fn default_group_count() -> u32 {
    4
}

fn default_batch_size() -> u32 {
    20_000
}

fn default_scrap_batch_size() -> u32 {
    3
}

fn default_restart_delay() -> u64 {
    10
}

fn default_sample_interval() -> u64 {
    5
}

fn default_throttle_cpu() -> f32 {
    85.0
}

fn default_critical_cpu() -> f32 {
    90.0
}

fn default_overload_dwell() -> u64 {
    15
}

fn default_cooldown() -> u64 {
    30
}

fn default_search_url_template() -> String {
    "https://www.google.com/maps/search/{query}/@{lat},{long}".to_string()
}

fn default_place_link_selector() -> String {
    "a[href^=\"https://www.google.com/maps/place/\"]".to_string()
}

fn default_place_url_prefix() -> String {
    "https://www.google.com/maps/place/".to_string()
}

fn default_results_container() -> String {
    "div[role=\"feed\"]".to_string()
}

fn default_navigation_timeout() -> u64 {
    120
}

fn default_detail_timeout() -> u64 {
    30
}

fn default_scroll_poll_interval() -> u64 {
    2000
}

fn default_stable_polls() -> u32 {
    3
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            first_group: default_first_group(),
            group_count: default_group_count(),
            batch_size: default_batch_size(),
            scrap_batch_size: default_scrap_batch_size(),
            restart_delay_secs: default_restart_delay(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_interval_secs: default_sample_interval(),
            throttle_cpu_percent: default_throttle_cpu(),
            critical_cpu_percent: default_critical_cpu(),
            overload_dwell_secs: default_overload_dwell(),
            cooldown_secs: default_cooldown(),
        }
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            search_url_template: default_search_url_template(),
            place_link_selector: default_place_link_selector(),
            place_url_prefix: default_place_url_prefix(),
            results_container_selector: default_results_container(),
            navigation_timeout_secs: default_navigation_timeout(),
            detail_timeout_secs: default_detail_timeout(),
            scroll_poll_interval_ms: default_scroll_poll_interval(),
            stable_polls: default_stable_polls(),
        }
    }
}
