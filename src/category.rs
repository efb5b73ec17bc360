//! # Category Classifier
//!
//! Maps a brief's free-text category/brand/market to a closed category tag, an
//! alcohol sub-type, numeric value floors, compliance guardrails and default
//! retailer/competitor seed lists.
//!
//! Classification is an ordered rule table: the first pattern that matches wins.
//! The tables are public so new categories can be added (and tested) without
//! touching the matching logic. Pure and deterministic; no I/O.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::research::locale::known_market;

const DRINKING_AGE: u8 = 18;
const US_DRINKING_AGE: u8 = 21;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Alcohol,
    Energy,
    Fmcg,
    Telco,
    Insurance,
    Banking,
    Qsr,
    Electronics,
    Beauty,
    Pet,
    Coffee,
    Dairy,
    Cheese,
    Snacks,
    Appliances,
    Generic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlcoholType {
    Wine,
    Beer,
    Spirits,
    Cider,
    Rtd,
    Unknown,
}

/// Category value floors used by the Offer Scorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDefaults {
    /// ASP anchor when the brief declares none.
    pub asp_fallback: f64,
    /// Minimum dollar value a reward must deliver to register.
    pub absolute_floor: f64,
    /// Minimum reward as % of ASP.
    pub percent_floor: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryGuardrails {
    pub legal_sensitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_age: Option<u8>,
    pub responsible_service_required: bool,
    #[serde(default)]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryProfile {
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alcohol_type: Option<AlcoholType>,
    pub defaults: CategoryDefaults,
    pub guardrails: CategoryGuardrails,
    /// Retailers from the brief, or the category seed list when none were given.
    pub retailers: Vec<String>,
    /// Competitors from the brief, or the category seed list when none were given.
    pub competitors: Vec<String>,
}

/// One row of an ordered rule table.
pub struct Rule<T> {
    pub result: T,
    pub pattern: Regex,
}

fn rule<T>(result: T, pattern: &str) -> Rule<T> {
    Rule {
        result,
        pattern: Regex::new(pattern).expect("category rule regex"),
    }
}

/// Order matters: more specific categories sit above the broad ones they overlap
/// with (cheese before dairy, appliances before electronics, FMCG last).
pub static CATEGORY_RULES: Lazy<Vec<Rule<Category>>> = Lazy::new(|| {
    vec![
        rule(
            Category::Alcohol,
            r"\b(alcohol|liquor|wines?|winery|beers?|brew(ery|ing)?|lager|ales?|ipa|spirits?|whisk(e)?y|vodka|gin|rum|tequila|bourbon|ciders?|rtds?|ready[- ]to[- ]drink|seltzers?|champagne|prosecco)\b",
        ),
        rule(
            Category::Energy,
            r"\b(electricity|energy retail(er)?|gas and electricity|power bill|energy plan|solar|utilit(y|ies))\b",
        ),
        rule(Category::Telco, r"\b(telco|telecom\w*|mobile plan|nbn|broadband|sim only|prepaid mobile|5g)\b"),
        rule(Category::Insurance, r"\b(insurance|insurer|car cover|home and contents|health cover|life cover)\b"),
        rule(Category::Banking, r"\b(bank(ing)?|credit card|home loan|savings account|debit card|fintech)\b"),
        rule(Category::Qsr, r"\b(qsr|quick service|fast food|burgers?|pizza|fried chicken|drive[- ]thru|takeaway)\b"),
        rule(
            Category::Appliances,
            r"\b(appliances?|whitegoods|white goods|fridges?|refrigerators?|washing machines?|washers?|dryers?|dishwashers?|ovens?|cooktops?|rangehoods?|vacuums?|air ?con(ditioners?)?)\b",
        ),
        rule(
            Category::Electronics,
            r"\b(electronics?|tvs?|televisions?|laptops?|headphones?|smartphones?|tablets?|cameras?|gaming|consoles?|audio|speakers?)\b",
        ),
        rule(Category::Beauty, r"\b(beauty|cosmetics?|skincare|skin care|make-?up|fragrances?|haircare|hair care)\b"),
        rule(Category::Pet, r"\b(pets?|pet ?food|dog food|cat food|petcare|pet care|kibble)\b"),
        rule(Category::Coffee, r"\b(coffee|espresso|coffee pods?|capsules?|instant coffee|cold brew)\b"),
        rule(Category::Cheese, r"\b(cheese|cheddar|brie|parmesan|mozzarella)\b"),
        rule(Category::Dairy, r"\b(dairy|milk|yoghurt|yogurt|butter|cream)\b"),
        rule(Category::Snacks, r"\b(snacks?|chips|crisps|biscuits?|confectionery|chocolate|lollies|candy|crackers?|nuts)\b"),
        rule(
            Category::Fmcg,
            r"\b(fmcg|cpg|grocery|supermarket|household|cleaning|laundry|personal care|beverages?|soft drinks?|juice|cereal|packaged)\b",
        ),
    ]
});

pub static ALCOHOL_RULES: Lazy<Vec<Rule<AlcoholType>>> = Lazy::new(|| {
    vec![
        rule(AlcoholType::Rtd, r"\b(rtds?|ready[- ]to[- ]drink|seltzers?|premix(ed)?|cans? of (vodka|gin|bourbon))\b"),
        rule(AlcoholType::Cider, r"\bciders?\b"),
        rule(AlcoholType::Wine, r"\b(wines?|winery|champagne|prosecco|shiraz|chardonnay|sauvignon|pinot|ros[eé])\b"),
        rule(AlcoholType::Beer, r"\b(beers?|brew(ery|ing)?|lager|ales?|ipa|pilsner|stout)\b"),
        rule(
            AlcoholType::Spirits,
            r"\b(spirits?|whisk(e)?y|vodka|gin|rum|tequila|bourbon|scotch|brandy|liqueur)\b",
        ),
    ]
});

/// First matching rule's result.
pub fn first_match<T: Copy>(rules: &[Rule<T>], text: &str) -> Option<T> {
    rules.iter().find(|r| r.pattern.is_match(text)).map(|r| r.result)
}

impl Category {
    pub fn defaults(self) -> CategoryDefaults {
        let (asp, abs, pct) = match self {
            Category::Alcohol => (20.0, 5.0, 10.0),
            Category::Energy => (1_800.0, 50.0, 3.0),
            Category::Fmcg => (6.0, 2.0, 20.0),
            Category::Telco => (60.0, 10.0, 10.0),
            Category::Insurance => (1_200.0, 50.0, 5.0),
            Category::Banking => (1_000.0, 100.0, 5.0),
            Category::Qsr => (15.0, 3.0, 15.0),
            Category::Electronics => (800.0, 30.0, 5.0),
            Category::Beauty => (40.0, 10.0, 15.0),
            Category::Pet => (50.0, 10.0, 12.0),
            Category::Coffee => (15.0, 3.0, 15.0),
            Category::Dairy => (6.0, 2.0, 20.0),
            Category::Cheese => (10.0, 2.0, 15.0),
            Category::Snacks => (5.0, 2.0, 20.0),
            Category::Appliances => (1_500.0, 50.0, 4.0),
            Category::Generic => (6.0, 2.0, 20.0),
        };
        CategoryDefaults {
            asp_fallback: asp,
            absolute_floor: abs,
            percent_floor: pct,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Alcohol => "alcohol",
            Category::Energy => "energy",
            Category::Fmcg => "FMCG",
            Category::Telco => "telco",
            Category::Insurance => "insurance",
            Category::Banking => "banking",
            Category::Qsr => "quick service restaurant",
            Category::Electronics => "consumer electronics",
            Category::Beauty => "beauty",
            Category::Pet => "pet care",
            Category::Coffee => "coffee",
            Category::Dairy => "dairy",
            Category::Cheese => "cheese",
            Category::Snacks => "snacks",
            Category::Appliances => "home appliances",
            Category::Generic => "consumer goods",
        }
    }

    fn guardrails(self, drinking_age: u8) -> CategoryGuardrails {
        match self {
            Category::Alcohol => CategoryGuardrails {
                legal_sensitive: true,
                min_age: Some(drinking_age),
                responsible_service_required: true,
                notes: vec![
                    format!("Entrants must be {drinking_age}+; age gate required on entry"),
                    "No association of alcohol with social, sexual or sporting success".into(),
                    "No encouragement of excessive or rapid consumption".into(),
                ],
            },
            Category::Banking | Category::Insurance => CategoryGuardrails {
                legal_sensitive: true,
                min_age: Some(18),
                responsible_service_required: false,
                notes: vec!["Financial promotions need product disclosure and T&C references".into()],
            },
            Category::Energy | Category::Telco => CategoryGuardrails {
                legal_sensitive: false,
                min_age: Some(18),
                responsible_service_required: false,
                notes: vec!["Contract-linked incentives must disclose plan conditions".into()],
            },
            _ => CategoryGuardrails::default(),
        }
    }

    fn seed_retailers(self) -> &'static [&'static str] {
        match self {
            Category::Alcohol => &["Dan Murphy's", "BWS", "Liquorland", "First Choice Liquor"],
            Category::Appliances | Category::Electronics => {
                &["Harvey Norman", "JB Hi-Fi", "The Good Guys", "Bing Lee"]
            }
            Category::Beauty => &["Priceline", "Chemist Warehouse", "Mecca", "Myer"],
            Category::Pet => &["Petbarn", "PETstock", "Woolworths", "Coles"],
            Category::Qsr | Category::Energy | Category::Telco | Category::Insurance | Category::Banking => &[],
            _ => &["Woolworths", "Coles", "ALDI", "IGA"],
        }
    }

    fn seed_competitors(self, alcohol: Option<AlcoholType>) -> &'static [&'static str] {
        match (self, alcohol) {
            (Category::Alcohol, Some(AlcoholType::Wine)) => &["Penfolds", "Jacob's Creek", "Yellow Tail", "Oyster Bay"],
            (Category::Alcohol, Some(AlcoholType::Beer)) => &["Carlton", "Great Northern", "XXXX", "Heineken"],
            (Category::Alcohol, Some(AlcoholType::Spirits)) => &["Jim Beam", "Smirnoff", "Bundaberg Rum", "Gordon's"],
            (Category::Alcohol, Some(AlcoholType::Cider)) => &["Somersby", "Strongbow", "Rekorderlig"],
            (Category::Alcohol, _) => &["Canadian Club", "Vodka Cruiser", "Smirnoff", "Carlton"],
            (Category::Appliances, _) => &["Samsung", "LG", "Bosch", "Fisher & Paykel", "Electrolux"],
            (Category::Electronics, _) => &["Samsung", "Sony", "LG", "Apple"],
            (Category::Telco, _) => &["Telstra", "Optus", "Vodafone", "TPG"],
            (Category::Energy, _) => &["AGL", "Origin", "EnergyAustralia", "Red Energy"],
            (Category::Insurance, _) => &["AAMI", "NRMA", "Allianz", "Budget Direct"],
            (Category::Banking, _) => &["CommBank", "Westpac", "ANZ", "NAB"],
            (Category::Qsr, _) => &["McDonald's", "KFC", "Hungry Jack's", "Domino's"],
            (Category::Beauty, _) => &["L'Oreal", "Maybelline", "Olay", "Nivea"],
            (Category::Pet, _) => &["Purina", "Pedigree", "Whiskas", "Royal Canin"],
            (Category::Coffee, _) => &["Nescafe", "Moccona", "Vittoria", "Nespresso"],
            (Category::Dairy, _) => &["a2 Milk", "Pauls", "Dairy Farmers", "Chobani"],
            (Category::Cheese, _) => &["Bega", "Mainland", "Coon", "Perfect Italiano"],
            (Category::Snacks, _) => &["Smith's", "Doritos", "Arnott's", "Cadbury"],
            (Category::Fmcg | Category::Generic, _) => &[],
        }
    }
}

/// Classify a brief. The seed retailer/competitor lists are Australian, so they
/// only apply to Australian (or unspecified) markets; US alcohol briefs get a
/// 21+ age limit.
pub fn classify(category: &str, brand: &str, market: &str) -> CategoryProfile {
    classify_with_hints(category, brand, market, &[], &[])
}

/// Like [`classify`] but keeps brief-supplied retailer/competitor hints.
pub fn classify_with_hints(
    category: &str,
    brand: &str,
    market: &str,
    retailers: &[String],
    competitors: &[String],
) -> CategoryProfile {
    let text = format!("{} {}", category, brand).to_lowercase();
    let tag = first_match(&CATEGORY_RULES, &text).unwrap_or(Category::Generic);
    let alcohol_type = (tag == Category::Alcohol)
        .then(|| first_match(&ALCOHOL_RULES, &text).unwrap_or(AlcoholType::Unknown));

    let home = known_market(market);
    let seeded = market.trim().is_empty() || home == Some("au");
    let drinking_age = if home == Some("us") { US_DRINKING_AGE } else { DRINKING_AGE };

    let retailers = if !seeded {
        retailers.to_vec()
    } else if retailers.is_empty() {
        tag.seed_retailers().iter().map(|s| s.to_string()).collect()
    } else {
        retailers.to_vec()
    };
    let competitors = if !seeded {
        competitors.to_vec()
    } else if competitors.is_empty() {
        tag.seed_competitors(alcohol_type)
            .iter()
            .filter(|c| !c.eq_ignore_ascii_case(brand.trim()))
            .map(|s| s.to_string())
            .collect()
    } else {
        competitors.to_vec()
    };

    CategoryProfile {
        category: tag,
        alcohol_type,
        defaults: tag.defaults(),
        guardrails: tag.guardrails(drinking_age),
        retailers,
        competitors,
    }
}

/// Classify straight from a campaign brief.
pub fn classify_campaign(c: &crate::campaign::CampaignContext) -> CategoryProfile {
    classify_with_hints(&c.category, &c.brand, &c.market, &c.retailers, &c.competitors)
}
