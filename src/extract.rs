//! # Signal Extractor
//!
//! Turns fetched page text into a structured [`CompetitorPromo`] using ordered
//! heuristic rule tables over lower-cased text. Every table is public data, so
//! a new signal is a new row rather than new control flow.
//!
//! Extraction never fails on odd input; a page without a decided promotion type
//! comes back as `ParseEmpty` and the caller drops it.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::campaign::Cadence;
use crate::category::{first_match, Rule};
use crate::error::EvidenceError;
use crate::research::filter::host_of;
use crate::research::types::{CompetitorPromo, PromoType, SearchResult};

/// Count token: digits with optional thousands separators, or a small number word.
const NUM: &str = r"(\d{1,3}(?:,\d{3})+|\d+|one|two|three|four|five|six|seven|eight|nine|ten|twelve|twenty|fifty|hundred)";

const CONFIDENCE_WITH_NUMBERS: f32 = 0.6;
const CONFIDENCE_TYPE_ONLY: f32 = 0.55;
const BRAND_SIMILARITY: f64 = 0.88;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("extract rule regex")
}

fn rule<T>(result: T, pattern: &str) -> Rule<T> {
    Rule {
        result,
        pattern: re(pattern),
    }
}

/// Cashback beats GWP beats prize. No row matching means `OTHER`.
pub static TYPE_RULES: Lazy<Vec<Rule<PromoType>>> = Lazy::new(|| {
    vec![
        rule(
            PromoType::Cashback,
            r"(cash ?back|money back|\brebates?\b|\bclaim (?:up to )?(?:a\$|\$)\d|\$\d[\d,]*(?:\.\d+)? back\b|\d+(?:\.\d+)?\s?% back\b)",
        ),
        rule(
            PromoType::Gwp,
            r"(gift with purchase|\bgwp\b|\bfree gift\b|\bbonus gift\b|\breceive a free\b|\bfree [a-z ]{1,30} with (?:every|any|each) purchase)",
        ),
        rule(
            PromoType::Prize,
            r"\b(win|winners?|prizes?|competition|giveaway|sweepstakes?|chance to|major draw|drawn)\b",
        ),
    ]
});

/// Capture group 1 holds the hero count. First matching row wins.
pub static HERO_COUNT_RULES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        re(&format!(r"\b{NUM} prizes?\b")),
        re(&format!(r"\b(?:1|one) of {NUM}\b")),
        re(&format!(r"\b{NUM} (?:major|grand|hero) prizes?\b")),
    ]
});

/// Capture group 1 holds the winner count. First matching row wins.
pub static WINNER_RULES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        re(&format!(r"\b{NUM} winners\b")),
        re(&format!(r"\bover {NUM} (?:lucky )?winners\b")),
        re(&format!(r"\b{NUM} total winners\b")),
    ]
});

/// Instant win beats weekly beats daily; only the first is reported.
pub static CADENCE_RULES: Lazy<Vec<Rule<Cadence>>> = Lazy::new(|| {
    vec![
        rule(Cadence::Instant, r"\binstant(?:ly)?[- ]?win"),
        rule(Cadence::Weekly, r"\b(weekly|every week|each week)\b"),
        rule(Cadence::Daily, r"\b(daily|every day|each day)\b"),
    ]
});

/// Prize item labels, in reporting order.
pub static PRIZE_ITEM_RULES: Lazy<Vec<Rule<&'static str>>> = Lazy::new(|| {
    vec![
        rule("car", r"\b(cars?|utes?|suvs?|vehicles?)\b"),
        rule("travel", r"\b(trips?|holidays?|getaways?|flights?|cruises?)\b"),
        rule("cash", r"\b(cash prizes?|\$[\d,]+ (?:in )?cash)\b"),
        rule("gift card", r"\b(e-?gift ?cards?|gift ?cards?|vouchers?)\b"),
        rule("tickets", r"\b(tickets?|vip pass(?:es)?|double passes?)\b"),
        rule("experience", r"\b(experiences?|money[- ]can'?t[- ]buy|meet (?:and|&) greet)\b"),
        rule("tech", r"\b(iphones?|ipads?|laptops?|consoles?|playstation|xbox|smart ?tvs?)\b"),
        rule("merchandise", r"\b(merch(?:andise)?|eskys?|cooler bags?)\b"),
        rule("product supply", r"\b(years?'? supply|year's supply)\b"),
    ]
});

static UP_TO_VALUE: Lazy<Regex> =
    Lazy::new(|| re(r"up to\s*(?:aud\s*|a\$|\$)\s?(\d{1,3}(?:,\d{3})+|\d+)(?:\.(\d{1,2}))?"));
static ANY_VALUE: Lazy<Regex> =
    Lazy::new(|| re(r"(?:\baud\s*|a\$|\$)\s?(\d{1,3}(?:,\d{3})+|\d+)(?:\.(\d{1,2}))?"));
static PERCENT_BACK: Lazy<Regex> =
    Lazy::new(|| re(r"(\d{1,2}(?:\.\d+)?)\s?%\s(?:cash ?)?back\b"));
static REDEMPTION: Lazy<Regex> = Lazy::new(|| {
    re(r"\b(redeem|redemption|claim (?:online|form|now|your)|submit (?:your )?claim|proof of purchase)\b")
});
static GIFT_CARD: Lazy<Regex> =
    Lazy::new(|| re(r"\b(e-?gift ?cards?|gift ?cards?|prepaid (?:visa|mastercard))\b"));

static RE_DROP_BLOCKS: Lazy<Regex> =
    Lazy::new(|| re(r"(?is)<(script|style|noscript|svg)\b[^>]*>.*?</(script|style|noscript|svg)\s*>"));
static RE_COMMENTS: Lazy<Regex> = Lazy::new(|| re(r"(?s)<!--.*?-->"));
static RE_TAGS: Lazy<Regex> = Lazy::new(|| re(r"(?is)</?[a-z!][^>]*>"));
static RE_WS: Lazy<Regex> = Lazy::new(|| re(r"\s+"));

/// Visible text of an HTML document (or fragment): scripts/styles and tags
/// removed, entities decoded, curly quotes flattened, whitespace collapsed.
pub fn page_text(html: &str) -> String {
    let out = RE_DROP_BLOCKS.replace_all(html, " ");
    let out = RE_COMMENTS.replace_all(&out, " ");
    let out = RE_TAGS.replace_all(&out, " ");
    let out = html_escape::decode_html_entities(&out)
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{2013}', '\u{2014}'], "-")
        .replace('\u{00A0}', " ");
    RE_WS.replace_all(&out, " ").trim().to_string()
}

/// Everything the heuristics found on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoSignals {
    #[serde(rename = "type")]
    pub promo_type: PromoType,
    pub hero_count: Option<u32>,
    pub total_winners: Option<u64>,
    pub cadence: Option<Cadence>,
    pub prize_items: Vec<String>,
    pub prize_value_hint: Option<String>,
    pub value_amount: Option<f64>,
    pub value_percent: Option<f64>,
    pub redemption: bool,
    pub gift_card: bool,
    pub confidence: f32,
}

impl PromoSignals {
    fn has_numbers(&self) -> bool {
        self.hero_count.is_some()
            || self.total_winners.is_some()
            || self.value_amount.is_some()
            || self.value_percent.is_some()
    }
}

fn parse_count(tok: &str) -> Option<u64> {
    let n = match tok {
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "twelve" => 12,
        "twenty" => 20,
        "fifty" => 50,
        "hundred" => 100,
        t => t.replace(',', "").parse().ok()?,
    };
    Some(n)
}

fn first_count(rules: &[Regex], text: &str) -> Option<u64> {
    rules
        .iter()
        .find_map(|r| r.captures(text))
        .and_then(|c| c.get(1))
        .and_then(|m| parse_count(m.as_str()))
        .filter(|n| *n > 0)
}

fn money(caps: &regex::Captures<'_>) -> Option<f64> {
    let whole = caps.get(1)?.as_str().replace(',', "");
    let raw = match caps.get(2) {
        Some(c) => format!("{whole}.{}", c.as_str()),
        None => whole,
    };
    raw.parse::<f64>().ok().filter(|v| v.is_finite() && *v > 0.0)
}

fn fmt_money(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("${}", v as u64)
    } else {
        format!("${v:.2}")
    }
}

/// Run every rule table over `text` (any case).
pub fn extract_promo_signals(text: &str) -> PromoSignals {
    let t = text.to_lowercase();

    let promo_type = first_match(&TYPE_RULES, &t).unwrap_or(PromoType::Other);
    let hero_count = first_count(&HERO_COUNT_RULES, &t)
        .filter(|n| *n <= 10_000)
        .map(|n| n as u32);
    let total_winners = first_count(&WINNER_RULES, &t);
    let cadence = first_match(&CADENCE_RULES, &t);

    let (value_amount, prize_value_hint) = if let Some(c) = UP_TO_VALUE.captures(&t) {
        let v = money(&c);
        (v, v.map(|v| format!("up to {}", fmt_money(v))))
    } else if let Some(c) = ANY_VALUE.captures(&t) {
        let v = money(&c);
        (v, v.map(fmt_money))
    } else {
        (None, None)
    };
    let value_percent = PERCENT_BACK
        .captures(&t)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|p| *p > 0.0 && *p <= 100.0);

    let prize_items = PRIZE_ITEM_RULES
        .iter()
        .filter(|r| r.pattern.is_match(&t))
        .map(|r| r.result.to_string())
        .collect();

    let mut s = PromoSignals {
        promo_type,
        hero_count,
        total_winners,
        cadence,
        prize_items,
        prize_value_hint,
        value_amount,
        value_percent,
        redemption: REDEMPTION.is_match(&t),
        gift_card: GIFT_CARD.is_match(&t),
        confidence: CONFIDENCE_TYPE_ONLY,
    };
    if s.promo_type != PromoType::Other && s.has_numbers() {
        s.confidence = CONFIDENCE_WITH_NUMBERS;
    }
    s
}

/// Lower-case words separated by single spaces; `&` and `'` survive.
fn norm_words(s: &str) -> String {
    s.to_lowercase()
        .split(|ch: char| !ch.is_alphanumeric() && ch != '\'' && ch != '&')
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
        None => String::new(),
    }
}

/// Which brand a page is about: a competitor named in the title/headline,
/// else a close spelling of one in the title, else the site's host label.
pub fn resolve_brand(title: &str, headline: &str, url: &str, competitors: &[String]) -> String {
    let hay = format!(" {} ", norm_words(&format!("{title} {headline}")));
    if let Some(c) = competitors.iter().find(|c| {
        let n = norm_words(c);
        !n.is_empty() && hay.contains(&format!(" {n} "))
    }) {
        return c.trim().to_string();
    }

    let words: Vec<String> = title
        .split(|ch: char| !ch.is_alphanumeric() && ch != '\'' && ch != '&')
        .filter(|w| w.len() >= 3)
        .map(str::to_lowercase)
        .collect();
    let mut best: Option<(f64, &String)> = None;
    for c in competitors {
        let cl = c.trim().to_lowercase();
        for w in &words {
            let score = strsim::jaro_winkler(w, &cl);
            if score >= BRAND_SIMILARITY && best.map_or(true, |(b, _)| score > b) {
                best = Some((score, c));
            }
        }
    }
    if let Some((_, c)) = best {
        return c.trim().to_string();
    }

    host_of(url)
        .and_then(|h| h.split('.').next().map(capitalize))
        .unwrap_or_default()
}

fn headline_for(text: &str, snippet: &str, title: &str) -> String {
    let pick = if !snippet.trim().is_empty() {
        snippet
    } else if !text.trim().is_empty() {
        text
    } else {
        title
    };
    let s = pick.trim();
    match s.char_indices().nth(200) {
        Some((i, _)) => s[..i].trim_end().to_string(),
        None => s.to_string(),
    }
}

/// Build one promo from a search hit plus the fetched page's visible text.
/// Pages with no decided type are `ParseEmpty`.
pub fn build_promo(
    result: &SearchResult,
    text: &str,
    competitors: &[String],
) -> Result<CompetitorPromo, EvidenceError> {
    let combined = format!("{} {} {}", result.title, result.snippet, text);
    let s = extract_promo_signals(&combined);
    if s.promo_type == PromoType::Other {
        return Err(EvidenceError::ParseEmpty(result.url.clone()));
    }

    let headline = headline_for(text, &result.snippet, &result.title);
    Ok(CompetitorPromo {
        brand: resolve_brand(&result.title, &headline, &result.url, competitors),
        title: result.title.clone(),
        headline,
        url: result.url.clone(),
        source: host_of(&result.url).unwrap_or_default(),
        promo_type: s.promo_type,
        hero_count: s.hero_count,
        total_winners: s.total_winners,
        cadence: s.cadence,
        prize_items: s.prize_items,
        prize_value_hint: s.prize_value_hint,
        value_amount: s.value_amount,
        value_percent: s.value_percent,
        redemption: s.redemption,
        gift_card: s.gift_card,
        confidence: s.confidence,
    })
}
