//! Host-side decision and finance rules.
//!
//! The model is asked to apply these rules itself, but its arithmetic is not
//! trusted: [`revalidate`] re-derives verification, area, sum insured, premium
//! and payout from the raw facts in [`ClaimEvidence`] and overwrites anything
//! that drifted, recording each correction as a [`ValidationGap`].

use crate::config::PolicyConfig;
use crate::schema::{ClaimEvidence, ExtractionResult, OwnershipEntry, VerificationStatus};
use crate::utils::{format_hectares, format_rupees, to_ascii_digits};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Crops the scale of finance knows by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Crop {
    Cotton,
    Potato,
    Onion,
    Soybean,
    Rice,
    Maize,
    Jowar,
    Bajra,
    Wheat,
    /// Land left uncultivated; never matches a claimed crop.
    Fallow,
    Other,
}

// English, Marathi and Hindi spellings seen on 7/12 extracts and in voice claims.
const CROP_ALIASES: &[(Crop, &[&str])] = &[
    (Crop::Fallow, &["fallow", "पडीक", "पडित", "पड़ती", "परती"]),
    (Crop::Cotton, &["cotton", "कापूस", "कपास"]),
    (Crop::Potato, &["potato", "बटाटा", "आलू", "आलु"]),
    (Crop::Onion, &["onion", "कांदा", "कांदे", "प्याज"]),
    (Crop::Soybean, &["soybean", "soyabean", "soya", "सोयाबीन", "सोयाबिन"]),
    (Crop::Rice, &["rice", "paddy", "भात", "तांदूळ", "धान", "चावल"]),
    (Crop::Maize, &["maize", "corn", "मका", "मक्का"]),
    (Crop::Jowar, &["jowar", "jwari", "sorghum", "ज्वारी", "ज्वार"]),
    (Crop::Bajra, &["bajra", "bajri", "pearl millet", "बाजरी", "बाजरा"]),
    (Crop::Wheat, &["wheat", "gahu", "गहू", "गेहूं", "गेहूँ", "गेहू"]),
];

// Splits on whitespace and ASCII punctuation only: Devanagari vowel signs and
// the virama are not alphanumeric and must stay inside their word.
fn crop_tokens(name: &str) -> Vec<String> {
    name.to_lowercase()
        .split(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// True when the alias appears as whole words, in order, inside `tokens`.
fn has_alias(tokens: &[String], alias: &str) -> bool {
    let words: Vec<&str> = alias.split_whitespace().collect();
    tokens
        .windows(words.len())
        .any(|window| window.iter().zip(&words).all(|(t, w)| t == w))
}

impl Crop {
    pub fn from_name(name: &str) -> Self {
        let tokens = crop_tokens(name);
        if tokens.is_empty() {
            return Crop::Other;
        }
        CROP_ALIASES
            .iter()
            .find(|(_, aliases)| aliases.iter().any(|alias| has_alias(&tokens, alias)))
            .map(|(crop, _)| *crop)
            .unwrap_or(Crop::Other)
    }

    pub fn rate_group(&self) -> RateGroup {
        match self {
            Crop::Cotton | Crop::Potato | Crop::Onion => RateGroup::CashCrop,
            Crop::Soybean | Crop::Rice | Crop::Maize => RateGroup::Cereal,
            Crop::Jowar | Crop::Bajra | Crop::Wheat => RateGroup::Millet,
            Crop::Fallow | Crop::Other => RateGroup::Others,
        }
    }

    pub fn premium_class(&self) -> PremiumClass {
        match self {
            Crop::Cotton | Crop::Potato | Crop::Onion => PremiumClass::Commercial,
            Crop::Jowar | Crop::Wheat => PremiumClass::Rabi,
            _ => PremiumClass::Kharif,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Crop::Other)
    }
}

/// Scale of finance groups, in rupees per hectare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RateGroup {
    CashCrop,
    Cereal,
    Millet,
    Others,
}

impl RateGroup {
    pub const ALL: [RateGroup; 4] = [
        RateGroup::CashCrop,
        RateGroup::Cereal,
        RateGroup::Millet,
        RateGroup::Others,
    ];

    pub fn rate_per_hectare(&self) -> f64 {
        match self {
            RateGroup::CashCrop => 60_000.0,
            RateGroup::Cereal => 45_000.0,
            RateGroup::Millet => 35_000.0,
            RateGroup::Others => 40_000.0,
        }
    }

    pub fn crops_label(&self) -> &'static str {
        match self {
            RateGroup::CashCrop => "Cotton / Potato / Onion",
            RateGroup::Cereal => "Soybean / Rice / Maize",
            RateGroup::Millet => "Jowar / Bajra / Wheat",
            RateGroup::Others => "Others",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PremiumClass {
    Commercial,
    Kharif,
    Rabi,
}

impl PremiumClass {
    pub const ALL: [PremiumClass; 3] = [
        PremiumClass::Commercial,
        PremiumClass::Kharif,
        PremiumClass::Rabi,
    ];

    /// Share of the sum insured paid as premium.
    pub fn rate(&self) -> f64 {
        match self {
            PremiumClass::Commercial => 0.05,
            PremiumClass::Kharif => 0.02,
            PremiumClass::Rabi => 0.015,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PremiumClass::Commercial => "Commercial",
            PremiumClass::Kharif => "Kharif",
            PremiumClass::Rabi => "Rabi",
        }
    }

    pub fn crops_label(&self) -> &'static str {
        match self {
            PremiumClass::Commercial => "Cotton / Potato / Onion",
            PremiumClass::Kharif => "Soybean / Rice / Maize / Bajra / Others",
            PremiumClass::Rabi => "Jowar / Wheat",
        }
    }

    /// Premium share as printed on the form, e.g. "1.5%".
    pub fn percent(&self) -> String {
        format!("{}%", format_percent(self.rate()))
    }

    pub fn describe(&self) -> String {
        format!("{} ({})", self.percent(), self.label())
    }
}

fn format_percent(rate: f64) -> String {
    let pct = rate * 100.0;
    if (pct - pct.round()).abs() < 1e-9 {
        format!("{}", pct.round() as i64)
    } else {
        format!("{:.1}", pct)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// First run of digits and dots in `text`, after Devanagari digits are mapped to ASCII.
fn first_numeric_token(text: &str) -> Option<String> {
    let ascii = to_ascii_digits(text);
    let start = ascii.find(|c: char| c.is_ascii_digit())?;
    let token: String = ascii[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    Some(token.trim_end_matches('.').to_string())
}

/// Reads an area in hectares. Understands plain decimals ("0.40 Ha"),
/// Devanagari numerals and the 7/12 `H.AA.SS` notation where "0.38.00" is
/// 0 hectares, 38 ares and 0 square metres.
pub fn parse_area(text: &str) -> Option<f64> {
    let token = first_numeric_token(text)?;
    let pieces: Vec<&str> = token.split('.').collect();
    match pieces.as_slice() {
        [hectares, ares, square_metres] => {
            let h: f64 = hectares.parse().ok()?;
            let a: f64 = if ares.is_empty() { 0.0 } else { ares.parse().ok()? };
            let s: f64 = if square_metres.is_empty() {
                0.0
            } else {
                square_metres.parse().ok()?
            };
            Some(h + a / 100.0 + s / 10_000.0)
        }
        _ => token.parse().ok(),
    }
}

/// Reads a rupee amount such as "₹30,000", "Rs. 1,500.50" or "३०,०००".
pub fn parse_amount(text: &str) -> Option<f64> {
    let without_grouping: String = text.chars().filter(|c| *c != ',').collect();
    let token = first_numeric_token(&without_grouping)?;
    let mut pieces = token.splitn(3, '.');
    let whole = pieces.next()?;
    match pieces.next() {
        Some(fraction) if !fraction.is_empty() => format!("{}.{}", whole, fraction).parse().ok(),
        _ => whole.parse().ok(),
    }
}

/// First four-digit year in a crop-year label such as "2025-26" or "२०१९-२०".
pub fn latest_year(text: &str) -> Option<i32> {
    let ascii = to_ascii_digits(text);
    ascii
        .split(|c: char| !c.is_ascii_digit())
        .find(|run| run.len() == 4)
        .and_then(|run| run.parse().ok())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recency {
    Current,
    Outdated,
}

/// A crop history is current only when its latest year falls in the policy
/// window. An unreadable year is treated as outdated.
pub fn recency(latest: Option<i32>, policy: &PolicyConfig) -> Recency {
    match latest {
        Some(year) if policy.current_years().contains(&year) => Recency::Current,
        _ => Recency::Outdated,
    }
}

fn crops_match(spoken: &str, document: &str) -> bool {
    let spoken_crop = Crop::from_name(spoken);
    let document_crop = Crop::from_name(document);
    if spoken_crop.is_known() || document_crop.is_known() {
        spoken_crop == document_crop
    } else {
        let (s, d) = (spoken.trim().to_lowercase(), document.trim().to_lowercase());
        !s.is_empty() && s == d
    }
}

/// Crop cross-check. An outdated document is ignored in favour of the voice
/// claim; a current one must list the spoken crop in its latest season.
pub fn verify_crop(recency: Recency, spoken: &str, document_crops: &[&str]) -> VerificationStatus {
    match recency {
        Recency::Outdated => VerificationStatus::VoiceOverride,
        Recency::Current => {
            let matched = document_crops
                .iter()
                .filter(|doc| Crop::from_name(doc) != Crop::Fallow)
                .any(|doc| crops_match(spoken, doc));
            if matched {
                VerificationStatus::Verified
            } else {
                VerificationStatus::Mismatch
            }
        }
    }
}

/// True when both sides of the comparison are crops the engine recognises,
/// so its verdict can override the model's.
fn crop_verdict_is_decidable(spoken: &str, document_crops: &[&str]) -> bool {
    Crop::from_name(spoken).is_known()
        && !document_crops.is_empty()
        && document_crops.iter().all(|doc| Crop::from_name(doc).is_known())
}

/// Name with surrounding brackets or parentheses removed.
pub fn strip_cancel_marks(name: &str) -> &str {
    name.trim()
        .trim_start_matches(['[', '('])
        .trim_end_matches([']', ')'])
        .trim()
}

/// Cancelled Namuna 7 entries are printed inside `[...]` or `(...)` or struck through.
pub fn is_cancelled(entry: &OwnershipEntry) -> bool {
    let name = entry.name.trim();
    entry.struck_through
        || (name.starts_with('[') && name.ends_with(']'))
        || (name.starts_with('(') && name.ends_with(')'))
}

fn name_tokens(name: &str) -> Vec<String> {
    strip_cancel_marks(name)
        .split(|c: char| c.is_whitespace() || c == '.' || c == ',')
        .filter(|t| t.chars().count() >= 2)
        .map(|t| t.to_lowercase())
        .collect()
}

/// Picks the claimant's active ownership entry. Cancelled entries are never
/// returned. A lone active entry is the claimant; otherwise `names` are tried
/// in order (exact name, then a unique best token overlap) and then the khate
/// number. Returns `None` when nothing identifies a single entry.
pub fn select_active_owner<'a>(
    entries: &'a [OwnershipEntry],
    names: &[&str],
    khate_number: &str,
) -> Option<&'a OwnershipEntry> {
    let active: Vec<&OwnershipEntry> = entries.iter().filter(|e| !is_cancelled(e)).collect();
    if let [only] = active.as_slice() {
        return Some(*only);
    }

    names
        .iter()
        .find_map(|name| owner_by_name(&active, name))
        .or_else(|| owner_by_khate(&active, khate_number))
}

fn owner_by_name<'a>(active: &[&'a OwnershipEntry], name: &str) -> Option<&'a OwnershipEntry> {
    let wanted = name_tokens(name);
    if wanted.is_empty() {
        return None;
    }
    if let Some(exact) = active.iter().find(|e| name_tokens(&e.name) == wanted) {
        return Some(*exact);
    }

    let scored: Vec<(usize, &'a OwnershipEntry)> = active
        .iter()
        .map(|entry| {
            let tokens = name_tokens(&entry.name);
            (wanted.iter().filter(|t| tokens.contains(t)).count(), *entry)
        })
        .collect();
    let best = scored.iter().map(|(overlap, _)| *overlap).max().unwrap_or(0);
    if best == 0 {
        return None;
    }
    single(scored.into_iter().filter(|(overlap, _)| *overlap == best).map(|(_, e)| e))
}

fn owner_by_khate<'a>(active: &[&'a OwnershipEntry], khate_number: &str) -> Option<&'a OwnershipEntry> {
    let wanted = to_ascii_digits(khate_number.trim());
    if wanted.is_empty() {
        return None;
    }
    single(
        active
            .iter()
            .copied()
            .filter(|e| to_ascii_digits(e.khate_number.trim()) == wanted),
    )
}

// Co-owners often share a surname or a khate; a tie identifies nobody.
fn single<'a>(mut hits: impl Iterator<Item = &'a OwnershipEntry>) -> Option<&'a OwnershipEntry> {
    match (hits.next(), hits.next()) {
        (Some(entry), None) => Some(entry),
        _ => None,
    }
}

/// Crop area, or the ownership area when the crop area is blank or zero.
pub fn effective_area(crop_area: &str, owner_area: Option<f64>) -> Option<f64> {
    match parse_area(crop_area) {
        Some(area) if area > 0.0 => Some(area),
        _ => owner_area.filter(|a| *a > 0.0),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropLine {
    pub crop_name: String,
    pub crop: Crop,
    pub area_hectare: f64,
    pub rate_per_hectare: f64,
    pub premium_class: PremiumClass,
    pub sum_insured: f64,
    pub premium: f64,
}

impl CropLine {
    pub fn new(crop_name: impl Into<String>, area_hectare: f64) -> Self {
        let crop_name = crop_name.into();
        let crop = Crop::from_name(&crop_name);
        let rate_per_hectare = crop.rate_group().rate_per_hectare();
        let premium_class = crop.premium_class();
        let sum_insured = round2(area_hectare * rate_per_hectare);
        let premium = round2(sum_insured * premium_class.rate());
        Self {
            crop_name,
            crop,
            area_hectare,
            rate_per_hectare,
            premium_class,
            sum_insured,
            premium,
        }
    }
}

/// Sum insured, premium and payout over every crop of the season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub lines: Vec<CropLine>,
    pub sum_insured: f64,
    pub premium: f64,
    /// Full-loss assumption: the payout equals the sum insured.
    pub estimated_payout: f64,
}

impl Assessment {
    pub fn total_area(&self) -> f64 {
        self.lines.iter().map(|l| l.area_hectare).sum()
    }

    pub fn rate_applied(&self) -> String {
        self.lines
            .iter()
            .map(|l| format!("{} / Ha ({})", format_rupees(l.rate_per_hectare), l.crop_name))
            .collect::<Vec<_>>()
            .join(" + ")
    }

    pub fn deductible_rule(&self) -> String {
        let mut classes: Vec<PremiumClass> = Vec::new();
        for line in &self.lines {
            if !classes.contains(&line.premium_class) {
                classes.push(line.premium_class);
            }
        }
        classes
            .iter()
            .map(PremiumClass::describe)
            .collect::<Vec<_>>()
            .join(" + ")
    }

    pub fn logic(&self) -> String {
        let terms: Vec<String> = self
            .lines
            .iter()
            .map(|l| {
                format!(
                    "({} Ha * {})",
                    format_hectares(l.area_hectare),
                    format_rupees(l.rate_per_hectare)
                )
            })
            .collect();
        format!(
            "{} = {} sum insured; payout at 100% loss = {}",
            terms.join(" + "),
            format_rupees(self.sum_insured),
            format_rupees(self.estimated_payout)
        )
    }
}

/// Values every crop at its scale of finance and sums the results.
pub fn assess(crops: &[(String, f64)]) -> Assessment {
    let lines: Vec<CropLine> = crops
        .iter()
        .map(|(name, area)| CropLine::new(name.clone(), *area))
        .collect();
    let sum_insured = round2(lines.iter().map(|l| l.sum_insured).sum());
    let premium = round2(lines.iter().map(|l| l.premium).sum());

    Assessment {
        lines,
        sum_insured,
        premium,
        estimated_payout: sum_insured,
    }
}

/// Something the host had to correct, or could not check, in a model reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationGap {
    VerificationCorrected {
        model: String,
        host: String,
    },
    CancelledOwnerSelected {
        selected: String,
        active: String,
    },
    CropReplaced {
        model: String,
        host: String,
    },
    AreaFallback {
        area_hectare: f64,
    },
    AreaCorrected {
        model: String,
        host: String,
    },
    PayoutDrift {
        model: String,
        host: String,
    },
    PremiumDrift {
        model: String,
        host: String,
    },
    InsufficientEvidence {
        details: String,
    },
}

impl fmt::Display for ValidationGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationGap::VerificationCorrected { model, host } => {
                write!(f, "verification status '{}' corrected to '{}'", model, host)
            }
            ValidationGap::CancelledOwnerSelected { selected, active } => write!(
                f,
                "cancelled owner entry '{}' replaced by active entry '{}'",
                selected, active
            ),
            ValidationGap::CropReplaced { model, host } => {
                write!(f, "crop '{}' replaced by spoken crop '{}'", model, host)
            }
            ValidationGap::AreaFallback { area_hectare } => write!(
                f,
                "crop area blank or zero, used ownership area {:.2} Ha",
                area_hectare
            ),
            ValidationGap::AreaCorrected { model, host } => {
                write!(f, "sown area '{}' corrected to the valued {} Ha", model, host)
            }
            ValidationGap::PayoutDrift { model, host } => {
                write!(f, "payout '{}' recomputed as {}", model, host)
            }
            ValidationGap::PremiumDrift { model, host } => {
                write!(f, "premium '{}' recomputed as {}", model, host)
            }
            ValidationGap::InsufficientEvidence { details } => {
                write!(f, "figures not re-checked: {}", details)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub recency: Option<Recency>,
    pub latest_year: Option<i32>,
    pub assessment: Option<Assessment>,
    pub gaps: Vec<ValidationGap>,
}

impl ValidationReport {
    fn note(&mut self, gap: ValidationGap) {
        warn!("Validation gap: {}", gap);
        self.gaps.push(gap);
    }
}

fn amounts_agree(model: &str, host: f64) -> bool {
    parse_amount(model).is_some_and(|value| (value - host).abs() < 1.0)
}

/// Crop lines for the season. Blank or zero areas share whatever part of the
/// ownership area the other crops leave free.
fn season_lines(
    evidence: &ClaimEvidence,
    recency: Recency,
    owner_area: Option<f64>,
    form_area: &str,
    form_crop: &str,
    report: &mut ValidationReport,
) -> Vec<(String, f64)> {
    let spoken = evidence.spoken_crop.trim();

    if recency == Recency::Outdated || evidence.crops.is_empty() {
        let name = if recency == Recency::Outdated && !spoken.is_empty() {
            spoken.to_string()
        } else if !evidence.document_crop.trim().is_empty() {
            evidence.document_crop.trim().to_string()
        } else {
            form_crop.trim().to_string()
        };
        // The recorded plot area still holds when its crop is stale.
        let documented: f64 = evidence
            .crops
            .iter()
            .filter(|c| Crop::from_name(&c.name) != Crop::Fallow)
            .filter_map(|c| parse_area(&c.area_hectare))
            .filter(|a| *a > 0.0)
            .sum();
        let area = if documented > 0.0 {
            Some(documented)
        } else {
            let area = effective_area(form_area, owner_area);
            if parse_area(form_area).filter(|a| *a > 0.0).is_none() {
                if let Some(area) = area {
                    report.note(ValidationGap::AreaFallback {
                        area_hectare: round2(area),
                    });
                }
            }
            area
        };
        return match area {
            Some(area) if !name.is_empty() => vec![(name, area)],
            _ => Vec::new(),
        };
    }

    let crops: Vec<(String, Option<f64>)> = evidence
        .crops
        .iter()
        .filter(|c| Crop::from_name(&c.name) != Crop::Fallow)
        .map(|c| {
            let name = if c.name_english.trim().is_empty() {
                c.name.trim().to_string()
            } else {
                c.name_english.trim().to_string()
            };
            let area = parse_area(&c.area_hectare).filter(|a| *a > 0.0);
            (name, area)
        })
        .collect();

    let blanks = crops.iter().filter(|(_, a)| a.is_none()).count();
    let known: f64 = crops.iter().filter_map(|(_, a)| *a).sum();
    let share = owner_area
        .map(|owner| (owner - known).max(0.0) / blanks.max(1) as f64)
        .filter(|s| *s > 0.0);

    if blanks > 0 {
        if let Some(share) = share {
            report.note(ValidationGap::AreaFallback {
                area_hectare: round2(share * blanks as f64),
            });
        }
    }

    crops
        .into_iter()
        .filter_map(|(name, area)| area.or(share).map(|a| (name, a)))
        .collect()
}

/// Re-applies the decision and finance rules to the model's extracted facts,
/// correcting the result in place.
pub fn revalidate(result: &mut ExtractionResult, policy: &PolicyConfig) -> ValidationReport {
    let mut report = ValidationReport::default();

    let Some(evidence) = result.evidence.clone() else {
        report.note(ValidationGap::InsufficientEvidence {
            details: "reply carried no evidence block".to_string(),
        });
        return report;
    };

    let year = latest_year(&evidence.latest_crop_year)
        .or_else(|| latest_year(&result.form_fields.financial_year));
    let recency = recency(year, policy);
    report.latest_year = year;
    report.recency = Some(recency);
    debug!("Crop history year {:?} is {:?}", year, recency);

    // Verification
    let mut document_crops: Vec<&str> = evidence.crops.iter().map(|c| c.name.as_str()).collect();
    document_crops.extend(
        evidence
            .crops
            .iter()
            .map(|c| c.name_english.as_str())
            .filter(|n| !n.trim().is_empty()),
    );
    if !evidence.document_crop.trim().is_empty() {
        document_crops.push(evidence.document_crop.as_str());
    }
    let host_status = verify_crop(recency, &evidence.spoken_crop, &document_crops);
    let model_status = result.verification.status.clone();
    let must_correct = match recency {
        Recency::Outdated => model_status != VerificationStatus::VoiceOverride,
        Recency::Current => {
            model_status == VerificationStatus::VoiceOverride
                || (model_status != host_status
                    && crop_verdict_is_decidable(&evidence.spoken_crop, &document_crops))
        }
    };
    if must_correct {
        report.note(ValidationGap::VerificationCorrected {
            model: model_status.to_string(),
            host: host_status.to_string(),
        });
        result.verification.status = host_status;
    }

    if recency == Recency::Outdated {
        let spoken = evidence.spoken_crop.trim();
        let form_crop = result.form_fields.crop_name.trim().to_string();
        if !spoken.is_empty() && !crops_match(spoken, &form_crop) {
            report.note(ValidationGap::CropReplaced {
                model: form_crop,
                host: spoken.to_string(),
            });
            result.form_fields.crop_name = spoken.to_string();
            result.form_fields.crop_name_english = String::new();
        }
    }

    // Identity
    let fields = &result.form_fields;
    let active = select_active_owner(
        &evidence.ownership_entries,
        &[
            evidence.spoken_name.as_str(),
            fields.farmer_full_name.as_str(),
            fields.farmer_full_name_english.as_str(),
        ],
        &fields.khate_number,
    );
    if active.is_none() && !evidence.ownership_entries.is_empty() {
        report.note(ValidationGap::InsufficientEvidence {
            details: "no active ownership entry matches the claimant".to_string(),
        });
    }
    if let Some(active) = active {
        let selected = strip_cancel_marks(&result.form_fields.farmer_full_name).to_string();
        let picked_cancelled = evidence
            .ownership_entries
            .iter()
            .filter(|e| is_cancelled(e))
            .any(|e| strip_cancel_marks(&e.name) == selected);
        let active_name = strip_cancel_marks(&active.name);
        if picked_cancelled && selected != active_name {
            report.note(ValidationGap::CancelledOwnerSelected {
                selected: result.form_fields.farmer_full_name.clone(),
                active: active_name.to_string(),
            });
            result.form_fields.farmer_full_name = active_name.to_string();
            result.form_fields.farmer_full_name_english = String::new();
            if !active.khate_number.trim().is_empty() {
                result.form_fields.khate_number = active.khate_number.clone();
            }
        }
    }
    let owner_area = active.and_then(|e| parse_area(&e.area_hectare));

    // Finance
    let crops = season_lines(
        &evidence,
        recency,
        owner_area,
        &result.form_fields.sown_area_hectare,
        &result.form_fields.crop_name,
        &mut report,
    );
    if crops.is_empty() {
        report.note(ValidationGap::InsufficientEvidence {
            details: "no crop with a usable area".to_string(),
        });
        return report;
    }

    let assessment = assess(&crops);
    let estimation = &mut result.claim_estimation;
    if !amounts_agree(&estimation.estimated_payout, assessment.estimated_payout) {
        report.note(ValidationGap::PayoutDrift {
            model: estimation.estimated_payout.clone(),
            host: format_rupees(assessment.estimated_payout),
        });
        estimation.estimated_payout = format_rupees(assessment.estimated_payout);
        estimation.rate_applied = assessment.rate_applied();
        estimation.deductible_rule = assessment.deductible_rule();
        estimation.logic = assessment.logic();
    }

    let fields = &mut result.form_fields;
    if !amounts_agree(&fields.premium_amount, assessment.premium) {
        report.note(ValidationGap::PremiumDrift {
            model: fields.premium_amount.clone(),
            host: format_rupees(assessment.premium),
        });
        fields.premium_amount = format_rupees(assessment.premium);
    }
    let valued_area = assessment.total_area();
    match parse_area(&fields.sown_area_hectare).filter(|a| *a > 0.0) {
        Some(model_area) if (model_area - valued_area).abs() < 0.005 => {}
        Some(_) => {
            report.note(ValidationGap::AreaCorrected {
                model: fields.sown_area_hectare.clone(),
                host: format_hectares(valued_area),
            });
            fields.sown_area_hectare = format_hectares(valued_area);
        }
        None => fields.sown_area_hectare = format_hectares(valued_area),
    }

    report.assessment = Some(assessment);
    report
}
