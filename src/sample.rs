//! Deterministic sample history so a fresh install has something to analyse.

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use spendwatch_domain::{Category, TransactionRecord};

pub const DEFAULT_SAMPLE_SEED: u64 = 42;
pub const DEFAULT_SAMPLE_MONTHS: u32 = 6;

/// Typical amount range and descriptions per category.
struct CategoryProfile {
    category: Category,
    /// Relative frequency among daily purchases.
    weight: u32,
    min: f64,
    max: f64,
    descriptions: &'static [&'static str],
}

const PROFILES: &[CategoryProfile] = &[
    CategoryProfile {
        category: Category::Food,
        weight: 40,
        min: 80.0,
        max: 700.0,
        descriptions: &["Groceries", "Lunch", "Dinner out", "Coffee", "Snacks"],
    },
    CategoryProfile {
        category: Category::Travel,
        weight: 20,
        min: 50.0,
        max: 900.0,
        descriptions: &["Metro card", "Cab ride", "Fuel", "Bus ticket"],
    },
    CategoryProfile {
        category: Category::Shopping,
        weight: 15,
        min: 300.0,
        max: 3_000.0,
        descriptions: &["Clothes", "Electronics", "Household items", "Books"],
    },
    CategoryProfile {
        category: Category::Entertainment,
        weight: 10,
        min: 200.0,
        max: 1_500.0,
        descriptions: &["Movie", "Streaming subscription", "Concert", "Games"],
    },
    CategoryProfile {
        category: Category::Other,
        weight: 15,
        min: 50.0,
        max: 800.0,
        descriptions: &["Pharmacy", "Gift", "Haircut", "Stationery"],
    },
];

const MONTHLY_BILLS: &[(u32, &str, f64)] = &[
    (1, "Rent", 12_000.0),
    (5, "Electricity", 1_800.0),
    (10, "Internet", 999.0),
    (15, "Mobile plan", 499.0),
];

/// Chance that a purchase is an unusually large one.
const SPLURGE_PROBABILITY: f64 = 0.015;

#[derive(Debug, Clone)]
pub struct SampleGenerator {
    seed: u64,
    months: u32,
    end: NaiveDate,
}

impl SampleGenerator {
    /// Generates `DEFAULT_SAMPLE_MONTHS` of history ending on `end` (inclusive).
    pub fn new(end: NaiveDate) -> Self {
        Self {
            seed: DEFAULT_SAMPLE_SEED,
            months: DEFAULT_SAMPLE_MONTHS,
            end,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_months(mut self, months: u32) -> Self {
        self.months = months.max(1);
        self
    }

    pub fn start(&self) -> NaiveDate {
        self.end
            .checked_sub_months(Months::new(self.months))
            .and_then(|date| date.checked_add_days(Days::new(1)))
            .unwrap_or(self.end)
    }

    /// Records in date order. Same seed and dates give the same amounts,
    /// categories and descriptions; record ids are always fresh.
    pub fn generate(&self) -> Vec<TransactionRecord> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let total_weight: u32 = PROFILES.iter().map(|profile| profile.weight).sum();
        let mut records = Vec::new();

        let mut date = self.start();
        while date <= self.end {
            for &(day, description, amount) in MONTHLY_BILLS {
                if date.day() == day {
                    records.push(TransactionRecord::new(
                        date,
                        amount,
                        Category::Bills,
                        Some(description.to_string()),
                    ));
                }
            }

            let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
            let purchases = if weekend {
                rng.gen_range(2..=4)
            } else {
                rng.gen_range(1..=3)
            };
            for _ in 0..purchases {
                let profile = pick_profile(&mut rng, total_weight);
                let mut amount = rng.gen_range(profile.min..profile.max);
                if weekend {
                    amount *= 1.2;
                }
                if rng.gen_bool(SPLURGE_PROBABILITY) {
                    amount *= rng.gen_range(5.0..9.0);
                }
                let description = profile
                    .descriptions
                    .choose(&mut rng)
                    .map(|text| text.to_string());
                records.push(TransactionRecord::new(
                    date,
                    (amount * 100.0).round() / 100.0,
                    profile.category,
                    description,
                ));
            }

            date = match date.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }
        records
    }
}

fn pick_profile(rng: &mut StdRng, total_weight: u32) -> &'static CategoryProfile {
    let mut roll = rng.gen_range(0..total_weight);
    for profile in PROFILES {
        if roll < profile.weight {
            return profile;
        }
        roll -= profile.weight;
    }
    &PROFILES[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    #[test]
    fn covers_six_months_inclusive() {
        let generator = SampleGenerator::new(end());
        assert_eq!(generator.start(), NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());

        let records = generator.generate();
        assert_eq!(records.first().map(|r| r.date()), Some(generator.start()));
        assert_eq!(records.last().map(|r| r.date()), Some(end()));
        assert!(records.windows(2).all(|w| w[0].date() <= w[1].date()));
        assert!(records.iter().all(|r| r.amount() > 0.0 && r.amount().is_finite()));
    }

    #[test]
    fn bills_recur_monthly() {
        let rent: Vec<_> = SampleGenerator::new(end())
            .generate()
            .into_iter()
            .filter(|r| r.description() == Some("Rent"))
            .collect();
        assert_eq!(rent.len(), 6);
        assert!(rent.iter().all(|r| r.category() == Category::Bills));
    }
}
