//! Country name resolution for the `country` matching algorithm.
//!
//! Values are folded (diacritics stripped, lowercased) and looked up in an
//! alias table covering ISO 3166 alpha-2/alpha-3 codes, English short names
//! and common native or colloquial names. Callers can extend the table with
//! [`CountryResolver::with_alias`].

use std::collections::HashMap;

use crate::normalize::fold_text;

/// Canonical name followed by its aliases.
static COUNTRIES: &[(&str, &[&str])] = &[
    ("Austria", &["at", "aut", "osterreich"]),
    ("Australia", &["au", "aus"]),
    ("Belgium", &["be", "bel", "belgie", "belgique", "belgien"]),
    ("Brazil", &["br", "bra", "brasil"]),
    ("Bulgaria", &["bg", "bgr"]),
    ("Canada", &["ca", "can"]),
    ("China", &["cn", "chn", "prc", "peoples republic of china"]),
    ("Croatia", &["hr", "hrv", "hrvatska"]),
    ("Cyprus", &["cy", "cyp"]),
    ("Czechia", &["cz", "cze", "czech republic", "cesko", "tschechien"]),
    ("Denmark", &["dk", "dnk", "danmark", "danemark"]),
    ("Estonia", &["ee", "est", "eesti"]),
    ("Finland", &["fi", "fin", "suomi", "finnland"]),
    ("France", &["fr", "fra", "frankreich"]),
    ("Germany", &["de", "deu", "deutschland", "federal republic of germany", "allemagne"]),
    ("Greece", &["gr", "grc", "hellas", "griechenland"]),
    ("Hungary", &["hu", "hun", "magyarorszag", "ungarn"]),
    ("Iceland", &["is", "isl", "island"]),
    ("India", &["in", "ind", "bharat"]),
    ("Ireland", &["ie", "irl", "eire", "irland"]),
    ("Israel", &["il", "isr"]),
    ("Italy", &["it", "ita", "italia", "italien"]),
    ("Japan", &["jp", "jpn", "nippon"]),
    ("Latvia", &["lv", "lva", "latvija"]),
    ("Liechtenstein", &["li", "lie"]),
    ("Lithuania", &["lt", "ltu", "lietuva"]),
    ("Luxembourg", &["lu", "lux", "luxemburg"]),
    ("Malta", &["mt", "mlt"]),
    ("Mexico", &["mx", "mex"]),
    ("Netherlands", &["nl", "nld", "holland", "nederland", "the netherlands", "niederlande"]),
    ("New Zealand", &["nz", "nzl", "aotearoa"]),
    ("Norway", &["no", "nor", "norge", "norwegen"]),
    ("Poland", &["pl", "pol", "polska", "polen"]),
    ("Portugal", &["pt", "prt"]),
    ("Romania", &["ro", "rou", "rumanien"]),
    ("Russian Federation", &["ru", "rus", "russia", "rossiya", "russland"]),
    ("Slovakia", &["sk", "svk", "slovensko", "slowakei"]),
    ("Slovenia", &["si", "svn", "slovenija", "slowenien"]),
    ("South Africa", &["za", "zaf"]),
    ("Korea, Republic of", &["kr", "kor", "south korea", "republic of korea"]),
    ("Spain", &["es", "esp", "espana", "spanien"]),
    ("Sweden", &["se", "swe", "sverige", "schweden"]),
    ("Switzerland", &["ch", "che", "schweiz", "suisse", "svizzera"]),
    ("Turkiye", &["tr", "tur", "turkey", "turkei"]),
    ("Ukraine", &["ua", "ukr"]),
    (
        "United Kingdom",
        &["gb", "gbr", "uk", "great britain", "britain", "england", "grossbritannien"],
    ),
    ("United States", &["us", "usa", "united states of america", "america", "vereinigte staaten"]),
];

/// Maps folded country spellings to a canonical name.
#[derive(Debug, Clone)]
pub struct CountryResolver {
    aliases: HashMap<String, String>,
}

impl Default for CountryResolver {
    fn default() -> Self {
        let mut aliases = HashMap::new();
        for (canonical, names) in COUNTRIES.iter() {
            aliases.insert(fold_text(canonical), canonical.to_string());
            for name in names.iter() {
                aliases.insert(fold_text(name), canonical.to_string());
            }
        }
        Self { aliases }
    }
}

impl CountryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extra spelling for a canonical country name.
    pub fn with_alias(mut self, alias: &str, canonical: &str) -> Self {
        self.aliases.insert(fold_text(alias), canonical.to_string());
        self
    }

    /// Resolve to a canonical name, or the folded input when unknown.
    pub fn resolve(&self, raw: &str) -> String {
        let folded = fold_text(raw);
        match self.aliases.get(&folded) {
            Some(canonical) => canonical.clone(),
            None => folded,
        }
    }

    /// 1.0 when both spellings name the same country.
    pub fn compare(&self, a: &str, b: &str) -> f64 {
        if self.resolve(a) == self.resolve(b) {
            1.0
        } else {
            0.0
        }
    }
}
