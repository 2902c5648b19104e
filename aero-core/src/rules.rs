use serde::Deserialize;

/// Booking policy handed to the orchestrator at construction time.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct BookingRules {
    #[serde(default = "default_max_passengers")]
    pub max_passengers_per_booking: usize,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
    #[serde(default = "default_number_prefix")]
    pub booking_number_prefix: String,
}

fn default_max_passengers() -> usize { 9 }
fn default_max_page_size() -> u64 { 100 }
fn default_number_prefix() -> String { "BK".to_string() }

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            max_passengers_per_booking: default_max_passengers(),
            max_page_size: default_max_page_size(),
            booking_number_prefix: default_number_prefix(),
        }
    }
}
