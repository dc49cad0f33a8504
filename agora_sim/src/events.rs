//! Store-wide system events rolled periodically by the world.

use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;
use std::str::FromStr;

/// A random store-wide event that shifts actor behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEvent {
    /// Customers buy more eagerly (purchase probability ×1.3, cap 0.8)
    Sale,

    /// Customers browse more (browse probability ×1.2, cap 0.6)
    NewArrivals,

    /// Staff slow down (efficiency ×0.8)
    Maintenance,
}

impl SystemEvent {
    pub fn all() -> [SystemEvent; 3] {
        [
            SystemEvent::Sale,
            SystemEvent::NewArrivals,
            SystemEvent::Maintenance,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            SystemEvent::Sale => "sale",
            SystemEvent::NewArrivals => "new_arrivals",
            SystemEvent::Maintenance => "maintenance",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SystemEvent::Sale => "Store-wide sale, customers more likely to buy",
            SystemEvent::NewArrivals => "New arrivals on the shelves, customers browse more",
            SystemEvent::Maintenance => "Store maintenance, staff efficiency reduced",
        }
    }

    /// With probability `probability`, picks one event uniformly.
    pub fn roll<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> Option<SystemEvent> {
        if rng.gen::<f64>() >= probability {
            return None;
        }
        Self::all().choose(rng).copied()
    }
}

impl fmt::Display for SystemEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SystemEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "sale" => Ok(SystemEvent::Sale),
            "new_arrivals" | "arrivals" => Ok(SystemEvent::NewArrivals),
            "maintenance" => Ok(SystemEvent::Maintenance),
            _ => Err(format!("Unknown system event: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_event_parse() {
        for event in SystemEvent::all() {
            assert_eq!(event.name().parse::<SystemEvent>(), Ok(event));
        }
        assert_eq!("New-Arrivals".parse::<SystemEvent>(), Ok(SystemEvent::NewArrivals));
        assert!("fire_drill".parse::<SystemEvent>().is_err());
    }

    #[test]
    fn test_roll_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..100 {
            assert!(SystemEvent::roll(&mut rng, 0.0).is_none());
            assert!(SystemEvent::roll(&mut rng, 1.0).is_some());
        }
    }
}
