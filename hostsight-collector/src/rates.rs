//! Previous-counter memory for the delta counter mode.

use std::collections::HashMap;

use crate::parser::{CpuTimes, InterfaceIo, percent};

/// Per-second traffic of one interface over the last interval.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceRate {
    pub interface: String,
    pub rx_bits_per_sec: f64,
    pub rx_packets_per_sec: f64,
    pub tx_bits_per_sec: f64,
    pub tx_packets_per_sec: f64,
}

#[derive(Debug, Clone)]
struct PrevInterface {
    counters: InterfaceIo,
    timestamp: i64,
}

/// Turns cumulative counters into interval values.
///
/// The first observation of a counter yields nothing. A counter that went
/// backwards (reboot, wrap, interface re-created) reads as zero for that
/// interval.
#[derive(Debug, Default)]
pub struct RateTracker {
    prev_cpu: Option<CpuTimes>,
    prev_network: HashMap<String, PrevInterface>,
    network_primed: bool,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Busy percentage since the previous observation.
    pub fn cpu_busy_percent(&mut self, current: CpuTimes) -> Option<f64> {
        let prev = self.prev_cpu.replace(current)?;

        let delta_total = current.total().saturating_sub(prev.total());
        let delta_busy = current.busy().saturating_sub(prev.busy());

        Some(percent(delta_busy as f64, delta_total as f64).min(100.0))
    }

    /// Per-second rates for every interface seen in the previous cycle too.
    ///
    /// `None` on the first observation. Afterwards the result may be empty
    /// when every interface is new. Interfaces missing from `current` are
    /// forgotten.
    pub fn network_rates(
        &mut self,
        current: &[InterfaceIo],
        timestamp: i64,
    ) -> Option<Vec<InterfaceRate>> {
        let mut rates = Vec::new();
        let mut next = HashMap::with_capacity(current.len());

        for io in current {
            if let Some(prev) = self.prev_network.get(&io.interface) {
                let elapsed = (timestamp - prev.timestamp) as f64 / 1000.0;
                if elapsed > 0.0 {
                    let per_sec = |now: u64, then: u64| now.saturating_sub(then) as f64 / elapsed;
                    let p = &prev.counters;
                    rates.push(InterfaceRate {
                        interface: io.interface.clone(),
                        rx_bits_per_sec: per_sec(io.rx_bytes, p.rx_bytes) * 8.0,
                        rx_packets_per_sec: per_sec(io.rx_packets, p.rx_packets),
                        tx_bits_per_sec: per_sec(io.tx_bytes, p.tx_bytes) * 8.0,
                        tx_packets_per_sec: per_sec(io.tx_packets, p.tx_packets),
                    });
                }
            }

            next.insert(
                io.interface.clone(),
                PrevInterface {
                    counters: io.clone(),
                    timestamp,
                },
            );
        }

        self.prev_network = next;
        let primed = std::mem::replace(&mut self.network_primed, true);
        primed.then_some(rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iface(name: &str, rx_bytes: u64, rx_packets: u64, tx_bytes: u64, tx_packets: u64) -> InterfaceIo {
        InterfaceIo {
            interface: name.to_string(),
            rx_bytes,
            rx_packets,
            tx_bytes,
            tx_packets,
        }
    }

    #[test]
    fn test_cpu_first_observation_yields_nothing() {
        let mut tracker = RateTracker::new();
        let cpu = CpuTimes {
            user: 100,
            nice: 0,
            system: 50,
            idle: 850,
        };
        assert_eq!(tracker.cpu_busy_percent(cpu), None);
    }

    #[test]
    fn test_cpu_interval_busy_percent() {
        let mut tracker = RateTracker::new();
        tracker.cpu_busy_percent(CpuTimes {
            user: 100,
            nice: 0,
            system: 50,
            idle: 850,
        });

        // 60 busy jiffies out of 100 since the last cycle
        let busy = tracker.cpu_busy_percent(CpuTimes {
            user: 140,
            nice: 10,
            system: 60,
            idle: 890,
        });
        assert_eq!(busy, Some(60.0));
    }

    #[test]
    fn test_cpu_counter_reset_saturates() {
        let mut tracker = RateTracker::new();
        tracker.cpu_busy_percent(CpuTimes {
            user: 1000,
            nice: 0,
            system: 1000,
            idle: 1000,
        });

        let busy = tracker.cpu_busy_percent(CpuTimes {
            user: 1,
            nice: 0,
            system: 1,
            idle: 1,
        });
        assert_eq!(busy, Some(0.0));
    }

    #[test]
    fn test_network_rates() {
        let mut tracker = RateTracker::new();

        assert_eq!(
            tracker.network_rates(&[iface("eth0", 1000, 10, 500, 5)], 10_000),
            None
        );

        let rates = tracker.network_rates(&[iface("eth0", 3000, 30, 1500, 9)], 12_000);
        assert_eq!(
            rates,
            Some(vec![InterfaceRate {
                interface: "eth0".to_string(),
                rx_bits_per_sec: 8000.0,
                rx_packets_per_sec: 10.0,
                tx_bits_per_sec: 4000.0,
                tx_packets_per_sec: 2.0,
            }])
        );
    }

    #[test]
    fn test_network_new_and_vanished_interfaces() {
        let mut tracker = RateTracker::new();
        tracker.network_rates(&[iface("eth0", 0, 0, 0, 0)], 0);

        // Primed, but nothing to compare wlan0 against yet
        let rates = tracker.network_rates(&[iface("wlan0", 100, 1, 100, 1)], 1_000);
        assert_eq!(rates, Some(vec![]));

        // eth0 was forgotten, so its return starts over
        let rates = tracker
            .network_rates(
                &[iface("eth0", 100, 1, 100, 1), iface("wlan0", 200, 2, 200, 2)],
                2_000,
            )
            .unwrap();
        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].interface, "wlan0");
    }

    #[test]
    fn test_network_same_timestamp_skipped() {
        let mut tracker = RateTracker::new();
        tracker.network_rates(&[iface("eth0", 0, 0, 0, 0)], 5_000);
        assert_eq!(
            tracker.network_rates(&[iface("eth0", 10, 1, 10, 1)], 5_000),
            Some(vec![])
        );
    }
}
