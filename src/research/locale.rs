// src/research/locale.rs
//! Market string → search/fetch locale.

use super::types::Locale;

/// Known markets. Aliases are matched case-insensitively after trimming.
const MARKETS: &[(&[&str], &str, &str)] = &[
    (&["au", "aus", "australia"], "au", "en-AU"),
    (&["nz", "new zealand", "aotearoa"], "nz", "en-NZ"),
    (&["uk", "gb", "united kingdom", "great britain", "england"], "gb", "en-GB"),
    (&["us", "usa", "united states", "america"], "us", "en-US"),
    (&["ca", "can", "canada"], "ca", "en-CA"),
];

fn lookup(market: &str) -> Option<(&'static str, &'static str)> {
    let m = market.trim().to_ascii_lowercase();
    MARKETS
        .iter()
        .find(|(aliases, _, _)| aliases.iter().any(|a| *a == m))
        .map(|(_, gl, lang)| (*gl, *lang))
}

/// Country code of a market the table knows, e.g. "Australia" → "au".
pub fn known_market(market: &str) -> Option<&'static str> {
    lookup(market).map(|(gl, _)| gl)
}

/// Map a market to `{gl, hl, acceptLanguage}`; unknown markets get the defaults.
pub fn market_locale(market: &str, default_gl: &str, default_hl: &str) -> Locale {
    if let Some((gl, lang)) = lookup(market) {
        return Locale {
            gl: gl.to_string(),
            hl: "en".to_string(),
            accept_language: format!("{lang},en;q=0.9"),
        };
    }
    let gl = default_gl.trim().to_ascii_lowercase();
    let hl = default_hl.trim().to_ascii_lowercase();
    Locale {
        accept_language: format!("{hl}-{},{hl};q=0.9", gl.to_ascii_uppercase()),
        gl,
        hl,
    }
}

/// Human-readable market name used in search queries.
pub fn market_name(gl: &str) -> &'static str {
    match gl {
        "au" => "Australia",
        "nz" => "New Zealand",
        "gb" => "UK",
        "us" => "USA",
        "ca" => "Canada",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_default_markets() {
        let l = market_locale(" Australia ", "us", "en");
        assert_eq!(l.gl, "au");
        assert_eq!(l.accept_language, "en-AU,en;q=0.9");
        assert_eq!(market_locale("UK", "au", "en").gl, "gb");

        let d = market_locale("Narnia", "au", "en");
        assert_eq!(d.gl, "au");
        assert_eq!(d.hl, "en");
        assert_eq!(d.accept_language, "en-AU,en;q=0.9");

        assert_eq!(known_market("United States"), Some("us"));
        assert_eq!(known_market("Narnia"), None);
    }
}
