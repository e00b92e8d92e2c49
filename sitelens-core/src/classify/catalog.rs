//! Website categories and their weighted path rules.
//!
//! The catalog is a static table: each category lists `(keyword, weight)`
//! pairs matched as lowercase substrings of a path, plus optional regexes
//! worth [`PATTERN_WEIGHT`] per matching path. Declaration order matters: it
//! breaks ties between equal scores.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Score added per unique path matching a category regex.
pub const PATTERN_WEIGHT: f64 = 3.0;

/// Business category of a website.
///
/// Variant order is catalog declaration order. [`WebsiteType::General`] is
/// the catch-all for sites that match nothing and has no rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebsiteType {
    Ecommerce,
    Saas,
    Blog,
    News,
    Portfolio,
    Agency,
    Restaurant,
    RealEstate,
    Education,
    Healthcare,
    Travel,
    Finance,
    Nonprofit,
    Events,
    Marketplace,
    Directory,
    Community,
    Government,
    Entertainment,
    Fitness,
    Legal,
    Automotive,
    General,
}

impl WebsiteType {
    /// Display name for dashboards.
    pub fn label(&self) -> &'static str {
        match self {
            WebsiteType::Ecommerce => "E-commerce",
            WebsiteType::Saas => "SaaS",
            WebsiteType::Blog => "Blog",
            WebsiteType::News => "News & Media",
            WebsiteType::Portfolio => "Portfolio",
            WebsiteType::Agency => "Agency",
            WebsiteType::Restaurant => "Restaurant",
            WebsiteType::RealEstate => "Real Estate",
            WebsiteType::Education => "Education",
            WebsiteType::Healthcare => "Healthcare",
            WebsiteType::Travel => "Travel",
            WebsiteType::Finance => "Finance",
            WebsiteType::Nonprofit => "Nonprofit",
            WebsiteType::Events => "Events",
            WebsiteType::Marketplace => "Marketplace",
            WebsiteType::Directory => "Directory",
            WebsiteType::Community => "Community",
            WebsiteType::Government => "Government",
            WebsiteType::Entertainment => "Entertainment",
            WebsiteType::Fitness => "Fitness",
            WebsiteType::Legal => "Legal",
            WebsiteType::Automotive => "Automotive",
            WebsiteType::General => "General",
        }
    }

    /// Storage/wire name (matches the serde representation).
    pub fn as_str(&self) -> &'static str {
        match self {
            WebsiteType::Ecommerce => "ecommerce",
            WebsiteType::Saas => "saas",
            WebsiteType::Blog => "blog",
            WebsiteType::News => "news",
            WebsiteType::Portfolio => "portfolio",
            WebsiteType::Agency => "agency",
            WebsiteType::Restaurant => "restaurant",
            WebsiteType::RealEstate => "real_estate",
            WebsiteType::Education => "education",
            WebsiteType::Healthcare => "healthcare",
            WebsiteType::Travel => "travel",
            WebsiteType::Finance => "finance",
            WebsiteType::Nonprofit => "nonprofit",
            WebsiteType::Events => "events",
            WebsiteType::Marketplace => "marketplace",
            WebsiteType::Directory => "directory",
            WebsiteType::Community => "community",
            WebsiteType::Government => "government",
            WebsiteType::Entertainment => "entertainment",
            WebsiteType::Fitness => "fitness",
            WebsiteType::Legal => "legal",
            WebsiteType::Automotive => "automotive",
            WebsiteType::General => "general",
        }
    }
}

impl std::str::FromStr for WebsiteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CATALOG
            .iter()
            .map(|rules| rules.website_type)
            .chain(std::iter::once(WebsiteType::General))
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown website type: {}", s))
    }
}

/// Rules for one category.
#[derive(Debug)]
pub struct CategoryRules {
    pub website_type: WebsiteType,
    pub keywords: &'static [(&'static str, f64)],
    pub patterns: &'static [&'static str],
}

/// The classification catalog, in tie-break order.
pub static CATALOG: &[CategoryRules] = &[
    CategoryRules {
        website_type: WebsiteType::Ecommerce,
        keywords: &[
            ("product", 3.0),
            ("cart", 4.0),
            ("checkout", 5.0),
            ("basket", 4.0),
            ("shop", 2.0),
            ("store", 2.0),
            ("collections", 2.0),
            ("wishlist", 3.0),
            ("order", 2.0),
            ("sale", 1.0),
        ],
        patterns: &[r"^/products?/[^/]+", r"^/(collections|catalog)/[^/]+", r"/sku[-/]?\d+"],
    },
    CategoryRules {
        website_type: WebsiteType::Saas,
        keywords: &[
            ("pricing", 3.0),
            ("dashboard", 4.0),
            ("signup", 2.0),
            ("login", 1.0),
            ("features", 2.0),
            ("integrations", 3.0),
            ("docs", 2.0),
            ("api", 2.0),
            ("trial", 3.0),
            ("settings", 2.0),
            ("onboarding", 3.0),
        ],
        patterns: &[r"^/app(/|$)", r"^/(docs|api)/v\d+"],
    },
    CategoryRules {
        website_type: WebsiteType::Blog,
        keywords: &[
            ("blog", 4.0),
            ("post", 2.0),
            ("tag", 1.5),
            ("author", 2.0),
            ("archive", 2.0),
            ("category", 1.0),
        ],
        patterns: &[r"^/blog/[^/]+", r"^/posts?/[^/]+"],
    },
    CategoryRules {
        website_type: WebsiteType::News,
        keywords: &[
            ("news", 4.0),
            ("article", 3.0),
            ("breaking", 4.0),
            ("politics", 3.0),
            ("world", 2.0),
            ("opinion", 2.0),
            ("headlines", 3.0),
            ("press", 1.5),
        ],
        patterns: &[r"^/news/[^/]+", r"^/articles?/[^/]+"],
    },
    CategoryRules {
        website_type: WebsiteType::Portfolio,
        keywords: &[
            ("portfolio", 5.0),
            ("projects", 2.0),
            ("work", 1.5),
            ("gallery", 2.0),
            ("resume", 4.0),
            ("cv", 3.0),
        ],
        patterns: &[r"^/(portfolio|projects)/[^/]+"],
    },
    CategoryRules {
        website_type: WebsiteType::Agency,
        keywords: &[
            ("services", 3.0),
            ("case-studies", 5.0),
            ("clients", 3.0),
            ("agency", 5.0),
            ("our-work", 4.0),
            ("team", 1.0),
        ],
        patterns: &[r"^/services/[^/]+"],
    },
    CategoryRules {
        website_type: WebsiteType::Restaurant,
        keywords: &[
            ("menu", 5.0),
            ("reservation", 5.0),
            ("order-online", 4.0),
            ("catering", 4.0),
            ("dine", 3.0),
            ("takeout", 4.0),
        ],
        patterns: &[r"^/menu/[^/]+"],
    },
    CategoryRules {
        website_type: WebsiteType::RealEstate,
        keywords: &[
            ("listings", 4.0),
            ("property", 4.0),
            ("properties", 4.0),
            ("homes-for-sale", 5.0),
            ("rent", 2.0),
            ("mortgage", 2.0),
            ("realtor", 5.0),
        ],
        patterns: &[r"^/(listings?|propert(y|ies))/[^/]+"],
    },
    CategoryRules {
        website_type: WebsiteType::Education,
        keywords: &[
            ("courses", 4.0),
            ("course", 3.0),
            ("lesson", 4.0),
            ("curriculum", 4.0),
            ("students", 3.0),
            ("admissions", 5.0),
            ("enroll", 4.0),
        ],
        patterns: &[r"^/courses?/[^/]+", r"/lessons?/\d+"],
    },
    CategoryRules {
        website_type: WebsiteType::Healthcare,
        keywords: &[
            ("patients", 4.0),
            ("doctors", 4.0),
            ("appointment", 4.0),
            ("clinic", 4.0),
            ("treatment", 3.0),
            ("health", 2.0),
            ("symptoms", 4.0),
        ],
        patterns: &[r"^/(doctors|providers)/[^/]+"],
    },
    CategoryRules {
        website_type: WebsiteType::Travel,
        keywords: &[
            ("destinations", 4.0),
            ("hotels", 4.0),
            ("flights", 5.0),
            ("booking", 2.0),
            ("tours", 3.0),
            ("travel", 3.0),
            ("itinerary", 4.0),
        ],
        patterns: &[r"^/(destinations|hotels|tours)/[^/]+"],
    },
    CategoryRules {
        website_type: WebsiteType::Finance,
        keywords: &[
            ("loans", 4.0),
            ("invest", 3.0),
            ("banking", 4.0),
            ("credit", 3.0),
            ("insurance", 3.0),
            ("accounts", 1.5),
            ("rates", 2.0),
        ],
        patterns: &[r"^/(loans|cards|accounts)/[^/]+"],
    },
    CategoryRules {
        website_type: WebsiteType::Nonprofit,
        keywords: &[
            ("donate", 5.0),
            ("volunteer", 4.0),
            ("mission", 2.0),
            ("impact", 2.0),
            ("campaign", 1.5),
            ("fundraise", 4.0),
        ],
        patterns: &[r"^/(donate|give)(/|$)"],
    },
    CategoryRules {
        website_type: WebsiteType::Events,
        keywords: &[
            ("events", 3.0),
            ("tickets", 4.0),
            ("schedule", 2.0),
            ("speakers", 4.0),
            ("agenda", 4.0),
            ("venue", 3.0),
            ("register", 1.0),
        ],
        patterns: &[r"^/events?/[^/]+"],
    },
    CategoryRules {
        website_type: WebsiteType::Marketplace,
        keywords: &[
            ("sellers", 4.0),
            ("vendors", 4.0),
            ("listing", 2.0),
            ("sell", 3.0),
            ("marketplace", 5.0),
            ("bids", 4.0),
        ],
        patterns: &[r"^/(sellers?|vendors?|stores?)/[^/]+/"],
    },
    CategoryRules {
        website_type: WebsiteType::Directory,
        keywords: &[
            ("directory", 5.0),
            ("browse", 2.0),
            ("near-me", 4.0),
            ("locations", 2.0),
            ("reviews", 2.0),
            ("businesses", 4.0),
        ],
        patterns: &[r"^/(directory|places)/[^/]+"],
    },
    CategoryRules {
        website_type: WebsiteType::Community,
        keywords: &[
            ("forum", 5.0),
            ("community", 4.0),
            ("threads", 3.0),
            ("members", 3.0),
            ("discussions", 4.0),
            ("groups", 2.0),
            ("profile", 1.0),
        ],
        patterns: &[r"^/(forum|t|threads?)/[^/]+"],
    },
    CategoryRules {
        website_type: WebsiteType::Government,
        keywords: &[
            ("permits", 5.0),
            ("council", 4.0),
            ("public-services", 5.0),
            ("residents", 4.0),
            ("forms", 1.5),
            ("department", 2.0),
        ],
        patterns: &[r"^/(departments|agencies)/[^/]+"],
    },
    CategoryRules {
        website_type: WebsiteType::Entertainment,
        keywords: &[
            ("watch", 3.0),
            ("episodes", 4.0),
            ("movies", 4.0),
            ("music", 3.0),
            ("games", 3.0),
            ("videos", 2.0),
            ("shows", 3.0),
        ],
        patterns: &[r"^/(watch|episodes?|movies?)/[^/]+"],
    },
    CategoryRules {
        website_type: WebsiteType::Fitness,
        keywords: &[
            ("workouts", 5.0),
            ("classes", 2.0),
            ("trainers", 4.0),
            ("membership", 2.0),
            ("gym", 4.0),
            ("nutrition", 3.0),
            ("yoga", 4.0),
        ],
        patterns: &[r"^/(workouts?|classes)/[^/]+"],
    },
    CategoryRules {
        website_type: WebsiteType::Legal,
        keywords: &[
            ("attorneys", 5.0),
            ("lawyers", 5.0),
            ("practice-areas", 5.0),
            ("consultation", 3.0),
            ("legal", 2.0),
            ("case-results", 4.0),
        ],
        patterns: &[r"^/practice-areas/[^/]+"],
    },
    CategoryRules {
        website_type: WebsiteType::Automotive,
        keywords: &[
            ("inventory", 3.0),
            ("vehicles", 4.0),
            ("dealer", 4.0),
            ("test-drive", 5.0),
            ("trade-in", 4.0),
            ("used-cars", 5.0),
            ("parts", 1.5),
        ],
        patterns: &[r"^/(inventory|vehicles)/[^/]+"],
    },
];

/// Each catalog entry paired with its compiled regexes, built on first use.
pub(crate) fn compiled_catalog() -> &'static [(&'static CategoryRules, Vec<Regex>)] {
    static COMPILED: OnceLock<Vec<(&'static CategoryRules, Vec<Regex>)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        CATALOG
            .iter()
            .map(|rules| {
                let regexes = rules
                    .patterns
                    .iter()
                    .map(|p| Regex::new(p).expect("catalog regex must compile"))
                    .collect();
                (rules, regexes)
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_has_22_distinct_categories() {
        let types: HashSet<_> = CATALOG.iter().map(|r| r.website_type).collect();
        assert_eq!(CATALOG.len(), 22);
        assert_eq!(types.len(), 22);
        assert!(!types.contains(&WebsiteType::General));
    }

    #[test]
    fn test_catalog_follows_enum_order() {
        for pair in CATALOG.windows(2) {
            assert!(pair[0].website_type < pair[1].website_type);
        }
    }

    #[test]
    fn test_patterns_compile() {
        let compiled = compiled_catalog();
        assert_eq!(compiled.len(), CATALOG.len());
        for ((rules, regexes), expected) in compiled.iter().zip(CATALOG) {
            assert_eq!(rules.website_type, expected.website_type);
            assert_eq!(regexes.len(), expected.patterns.len());
        }
    }

    #[test]
    fn test_keywords_are_lowercase() {
        for rules in CATALOG {
            for (keyword, weight) in rules.keywords {
                assert_eq!(*keyword, keyword.to_ascii_lowercase());
                assert!(*weight > 0.0);
            }
        }
    }

    #[test]
    fn test_website_type_round_trips_through_str() {
        for rules in CATALOG {
            let parsed: WebsiteType = rules.website_type.as_str().parse().unwrap();
            assert_eq!(parsed, rules.website_type);
        }
        assert_eq!("general".parse::<WebsiteType>().unwrap(), WebsiteType::General);
        assert!("casino".parse::<WebsiteType>().is_err());
    }

    #[test]
    fn test_serde_name_matches_as_str() {
        let json = serde_json::to_string(&WebsiteType::RealEstate).unwrap();
        assert_eq!(json, "\"real_estate\"");
    }
}
