use std::collections::HashSet;

/// A user's preference signals with every movie id resolved to a title.
///
/// Built fresh for each recommendation request; ids whose metadata lookup
/// failed are simply absent.
#[derive(Debug, Default, Clone)]
pub struct PreferenceProfile {
    pub favorite_titles: Vec<String>,
    pub watchlist_titles: Vec<String>,
    pub rating_buckets: RatingBuckets,
}

#[derive(Debug, Default, Clone)]
pub struct RatingBuckets {
    /// Rated 8-10: strongest positive signal
    pub high: Vec<String>,
    /// Rated 6-7: weak positive signal
    pub medium: Vec<String>,
    /// Rated below 6: explicit negative signal
    pub low: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    High,
    Medium,
    Low,
}

/// Fixed thresholds partitioning the 1-10 rating scale
pub fn bucket_for(rating: i32) -> Bucket {
    if rating >= 8 {
        Bucket::High
    } else if rating >= 6 {
        Bucket::Medium
    } else {
        Bucket::Low
    }
}

impl RatingBuckets {
    pub fn push(&mut self, rating: i32, title: String) {
        match bucket_for(rating) {
            Bucket::High => self.high.push(title),
            Bucket::Medium => self.medium.push(title),
            Bucket::Low => self.low.push(title),
        }
    }
}

impl PreferenceProfile {
    /// True when there is no positive signal to seed a personalized prompt.
    ///
    /// Low and medium ratings alone are not enough to personalize on, so
    /// they do not count.
    pub fn is_empty_signal(&self) -> bool {
        self.favorite_titles.is_empty()
            && self.rating_buckets.high.is_empty()
            && self.watchlist_titles.is_empty()
    }

    /// Every title the user already knows, lowercased for comparison
    pub fn known_titles(&self) -> HashSet<String> {
        self.favorite_titles
            .iter()
            .chain(self.watchlist_titles.iter())
            .chain(self.rating_buckets.high.iter())
            .chain(self.rating_buckets.medium.iter())
            .chain(self.rating_buckets.low.iter())
            .map(|t| t.to_lowercase())
            .collect()
    }

    /// Builds the personalized prompt from the profile's labeled sections.
    ///
    /// Section order is fixed: favorites, high-rated, medium-rated,
    /// watchlist, low-rated, then the full exclusion list. Empty sections
    /// are omitted. The same profile always yields byte-identical text.
    pub fn build_prompt(&self) -> String {
        let mut sections = Vec::new();

        if !self.favorite_titles.is_empty() {
            sections.push(format!(
                "FAVORITE MOVIES: {}",
                self.favorite_titles.join(", ")
            ));
        }
        if !self.rating_buckets.high.is_empty() {
            sections.push(format!(
                "HIGHLY RATED (8-10): {}",
                self.rating_buckets.high.join(", ")
            ));
        }
        if !self.rating_buckets.medium.is_empty() {
            sections.push(format!(
                "MODERATELY RATED (6-7): {}",
                self.rating_buckets.medium.join(", ")
            ));
        }
        if !self.watchlist_titles.is_empty() {
            sections.push(format!(
                "ON WATCHLIST: {}",
                self.watchlist_titles.join(", ")
            ));
        }
        if !self.rating_buckets.low.is_empty() {
            sections.push(format!(
                "LOW RATED, AVOID SIMILAR: {}",
                self.rating_buckets.low.join(", ")
            ));
        }

        let mut excluded: Vec<&str> = Vec::new();
        for title in self
            .favorite_titles
            .iter()
            .chain(self.rating_buckets.high.iter())
            .chain(self.rating_buckets.medium.iter())
            .chain(self.watchlist_titles.iter())
            .chain(self.rating_buckets.low.iter())
        {
            excluded.push(title);
        }
        if !excluded.is_empty() {
            sections.push(format!("DO NOT RECOMMEND: {}", excluded.join(", ")));
        }

        format!(
            "Based on this user's movie taste:\n\n{}\n\n\
             Recommend exactly 20 other movies this user would enjoy.",
            sections.join("\n")
        )
    }
}

/// Prompt used when a user has no favorites, no highly-rated movies, and
/// no watchlist to personalize on
pub const NEW_USER_PROMPT: &str =
    "Recommend exactly 20 broadly popular, critically acclaimed movies spanning a \
     diverse range of genres.";

/// Simple favorites-only prompt, kept as a fallback when the profile-aware
/// path produces nothing
pub fn legacy_prompt(favorite_titles: &[String]) -> String {
    format!(
        "Based on these movies: {}, recommend exactly 20 other movies.",
        favorite_titles.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_bucket_thresholds() {
        assert_eq!(bucket_for(10), Bucket::High);
        assert_eq!(bucket_for(8), Bucket::High);
        assert_eq!(bucket_for(7), Bucket::Medium);
        assert_eq!(bucket_for(6), Bucket::Medium);
        assert_eq!(bucket_for(5), Bucket::Low);
        assert_eq!(bucket_for(1), Bucket::Low);
    }

    #[test]
    fn test_buckets_partition_ratings() {
        let mut buckets = RatingBuckets::default();
        for (rating, title) in [(9, "A"), (8, "B"), (7, "C"), (6, "D"), (5, "E"), (1, "F")] {
            buckets.push(rating, title.to_string());
        }

        assert_eq!(buckets.high, titles(&["A", "B"]));
        assert_eq!(buckets.medium, titles(&["C", "D"]));
        assert_eq!(buckets.low, titles(&["E", "F"]));

        let total = buckets.high.len() + buckets.medium.len() + buckets.low.len();
        assert_eq!(total, 6);
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let profile = PreferenceProfile {
            favorite_titles: titles(&["Inception", "Heat"]),
            watchlist_titles: titles(&["Dune"]),
            rating_buckets: RatingBuckets {
                high: titles(&["Interstellar"]),
                medium: titles(&["Tenet"]),
                low: titles(&["Cats"]),
            },
        };

        assert_eq!(profile.build_prompt(), profile.build_prompt());
    }

    #[test]
    fn test_prompt_section_order() {
        let profile = PreferenceProfile {
            favorite_titles: titles(&["Inception"]),
            watchlist_titles: titles(&["Dune"]),
            rating_buckets: RatingBuckets {
                high: titles(&["Interstellar"]),
                medium: titles(&["Tenet"]),
                low: titles(&["Cats"]),
            },
        };

        let prompt = profile.build_prompt();
        let favorites = prompt.find("FAVORITE MOVIES:").unwrap();
        let high = prompt.find("HIGHLY RATED").unwrap();
        let medium = prompt.find("MODERATELY RATED").unwrap();
        let watchlist = prompt.find("ON WATCHLIST:").unwrap();
        let low = prompt.find("LOW RATED").unwrap();
        let excluded = prompt.find("DO NOT RECOMMEND:").unwrap();

        assert!(favorites < high);
        assert!(high < medium);
        assert!(medium < watchlist);
        assert!(watchlist < low);
        assert!(low < excluded);
    }

    #[test]
    fn test_prompt_omits_empty_sections() {
        let profile = PreferenceProfile {
            favorite_titles: titles(&["Inception"]),
            ..Default::default()
        };

        let prompt = profile.build_prompt();
        assert!(prompt.contains("FAVORITE MOVIES: Inception"));
        assert!(!prompt.contains("HIGHLY RATED"));
        assert!(!prompt.contains("ON WATCHLIST"));
        assert!(prompt.contains("DO NOT RECOMMEND: Inception"));
    }

    #[test]
    fn test_empty_signal_ignores_low_and_medium_ratings() {
        let profile = PreferenceProfile {
            rating_buckets: RatingBuckets {
                medium: titles(&["Tenet"]),
                low: titles(&["Cats"]),
                ..Default::default()
            },
            ..Default::default()
        };

        assert!(profile.is_empty_signal());
    }

    #[test]
    fn test_known_titles_lowercases_everything() {
        let profile = PreferenceProfile {
            favorite_titles: titles(&["Inception"]),
            watchlist_titles: titles(&["DUNE"]),
            rating_buckets: RatingBuckets {
                high: titles(&["Interstellar"]),
                ..Default::default()
            },
        };

        let known = profile.known_titles();
        assert!(known.contains("inception"));
        assert!(known.contains("dune"));
        assert!(known.contains("interstellar"));
        assert_eq!(known.len(), 3);
    }
}
