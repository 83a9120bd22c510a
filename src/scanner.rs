use heapless::Vec;

pub const DEFAULT_SCAN_INTERVAL_MS: u64 = 3_000;
pub const MAX_SCANS_PER_POLL: usize = 8;

const LCG_SEED: u64 = 0x1234_5678_9ABC_DEF0;

/// Inventory items the simulated scanner can report.
pub fn default_catalog() -> std::vec::Vec<String> {
    [
        "Box #A-1234",
        "Pallet #B-5678",
        "Container #C-9012",
        "Shelf Unit #D-3456",
        "Crate #E-7890",
    ]
    .iter()
    .map(|label| (*label).to_string())
    .collect()
}

/// Chooses the next item label out of the catalog.
pub trait ItemPicker: Send {
    fn pick(&mut self, catalog: &[String]) -> String;
}

/// Linear congruential pick; the same seed always yields the same label
/// sequence.
#[derive(Debug, Clone)]
pub struct LcgPicker {
    rng_state: u64,
}

impl LcgPicker {
    pub fn new(seed: u64) -> Self {
        Self { rng_state: seed }
    }

    fn next_random(&mut self) -> u64 {
        self.rng_state = self
            .rng_state
            .wrapping_mul(1_664_525)
            .wrapping_add(1_013_904_223);
        self.rng_state
    }
}

impl Default for LcgPicker {
    fn default() -> Self {
        Self::new(LCG_SEED)
    }
}

impl ItemPicker for LcgPicker {
    fn pick(&mut self, catalog: &[String]) -> String {
        debug_assert!(!catalog.is_empty());
        if catalog.is_empty() {
            return String::new();
        }
        let index = (self.next_random() % catalog.len() as u64) as usize;
        catalog[index].clone()
    }
}

/// Cycles through the catalog in order; used where tests need exact labels.
#[derive(Debug, Clone, Default)]
pub struct RoundRobinPicker {
    next: usize,
}

impl ItemPicker for RoundRobinPicker {
    fn pick(&mut self, catalog: &[String]) -> String {
        debug_assert!(!catalog.is_empty());
        if catalog.is_empty() {
            return String::new();
        }
        let label = catalog[self.next % catalog.len()].clone();
        self.next = (self.next + 1) % catalog.len();
        label
    }
}

/// One inventory scan produced by the generator, not yet in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEvent {
    pub item_label: String,
    pub at_ms: u64,
}

/// Interval-driven scan production.
///
/// Armed while the mission is scanning, disarmed the instant it is not. The
/// due time always derives from the most recent arming, so pausing and
/// resuming can never replay a boundary left over from an earlier session.
pub struct ScanGenerator {
    interval_ms: u64,
    catalog: std::vec::Vec<String>,
    picker: Box<dyn ItemPicker>,
    next_due_ms: Option<u64>,
}

impl ScanGenerator {
    pub fn new(interval_ms: u64, catalog: std::vec::Vec<String>) -> Self {
        Self::with_picker(interval_ms, catalog, Box::new(LcgPicker::default()))
    }

    pub fn with_picker(
        interval_ms: u64,
        catalog: std::vec::Vec<String>,
        picker: Box<dyn ItemPicker>,
    ) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
            catalog,
            picker,
            next_due_ms: None,
        }
    }

    pub fn set_picker(&mut self, picker: Box<dyn ItemPicker>) {
        self.picker = picker;
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn is_armed(&self) -> bool {
        self.next_due_ms.is_some()
    }

    /// Starts the interval at `now_ms`; the first scan lands one full
    /// interval later.
    pub fn arm(&mut self, now_ms: u64) {
        self.next_due_ms = Some(now_ms + self.interval_ms);
    }

    /// Stops production and drops any scheduled boundary.
    pub fn disarm(&mut self) {
        self.next_due_ms = None;
    }

    /// Drains every interval boundary crossed by `now_ms`, one event per
    /// boundary, capped per call.
    pub fn poll(&mut self, now_ms: u64) -> Vec<ScanEvent, MAX_SCANS_PER_POLL> {
        let mut events = Vec::new();
        let mut due = match self.next_due_ms {
            Some(due) => due,
            None => return events,
        };

        while now_ms >= due && events.len() < MAX_SCANS_PER_POLL {
            let event = ScanEvent {
                item_label: self.picker.pick(&self.catalog),
                at_ms: due,
            };
            let _ = events.push(event);
            due += self.interval_ms;
        }

        self.next_due_ms = Some(due);
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_catalog() -> std::vec::Vec<String> {
        vec!["Alpha".to_string(), "Beta".to_string(), "Gamma".to_string()]
    }

    #[test]
    fn test_disarmed_generator_produces_nothing() {
        let mut generator = ScanGenerator::new(3_000, test_catalog());
        assert!(!generator.is_armed());
        assert!(generator.poll(60_000).is_empty());
    }

    #[test]
    fn test_first_scan_lands_one_interval_after_arming() {
        let mut generator = ScanGenerator::new(3_000, test_catalog());
        generator.arm(1_000);

        assert!(generator.poll(3_999).is_empty());
        let events = generator.poll(4_000);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].at_ms, 4_000);
    }

    #[test]
    fn test_poll_catches_up_one_event_per_boundary() {
        let mut generator =
            ScanGenerator::with_picker(3_000, test_catalog(), Box::new(RoundRobinPicker::default()));
        generator.arm(0);

        let events = generator.poll(9_500);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].at_ms, 3_000);
        assert_eq!(events[1].at_ms, 6_000);
        assert_eq!(events[2].at_ms, 9_000);

        // Nothing left until the next boundary.
        assert!(generator.poll(11_900).is_empty());
        assert_eq!(generator.poll(12_000).len(), 1);
    }

    #[test]
    fn test_catch_up_is_capped_per_poll() {
        let mut generator = ScanGenerator::new(1_000, test_catalog());
        generator.arm(0);

        let events = generator.poll(1_000_000);
        assert_eq!(events.len(), MAX_SCANS_PER_POLL);
    }

    #[test]
    fn test_rearming_drops_stale_boundaries() {
        let mut generator = ScanGenerator::new(3_000, test_catalog());
        generator.arm(0);
        assert_eq!(generator.poll(3_000).len(), 1);

        // Paused at 4 s, resumed at 20 s. The boundary that would have fired
        // at 6 s must not replay.
        generator.disarm();
        assert!(generator.poll(30_000).is_empty());

        generator.arm(20_000);
        assert!(generator.poll(22_999).is_empty());
        let events = generator.poll(23_000);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].at_ms, 23_000);
    }

    #[test]
    fn test_round_robin_cycles_in_order() {
        let catalog = test_catalog();
        let mut picker = RoundRobinPicker::default();
        let labels: std::vec::Vec<String> = (0..4).map(|_| picker.pick(&catalog)).collect();
        assert_eq!(labels, vec!["Alpha", "Beta", "Gamma", "Alpha"]);
    }

    #[test]
    fn test_lcg_picker_is_deterministic_per_seed() {
        let catalog = default_catalog();
        let mut first = LcgPicker::new(42);
        let mut second = LcgPicker::new(42);

        for _ in 0..16 {
            assert_eq!(first.pick(&catalog), second.pick(&catalog));
        }
    }

    #[test]
    fn test_lcg_picker_stays_inside_catalog() {
        let catalog = default_catalog();
        let mut picker = LcgPicker::default();
        for _ in 0..64 {
            let label = picker.pick(&catalog);
            assert!(catalog.contains(&label));
        }
    }
}
