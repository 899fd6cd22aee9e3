use model::core::data_type::DataType;
use model::mapping::dictionary::{FIELD_DICTIONARY, FieldSpec};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use strsim::jaro_winkler;

/// Suggestions below this confidence are reported as no-match.
const MIN_CONFIDENCE: f64 = 0.55;
/// Prefix matches never score below this, so they beat fuzzy ones.
const PREFIX_FLOOR: f64 = 0.9;
const TYPE_MATCH_BOOST: f64 = 1.15;
const TYPE_MISMATCH_PENALTY: f64 = 0.5;
/// Values sampled per column when computing type signatures.
const SAMPLE_LIMIT: usize = 20;

/// Advisory match of one dictionary field to one source column.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MappingSuggestion {
    pub target_field: String,
    pub source_column: Option<String>,
    pub confidence: f64,
}

/// Proposes a column → field mapping from extracted headers and a sample of
/// each column's values. Purely advisory; the operator's mapping call is
/// authoritative.
pub fn suggest(
    headers: &[String],
    samples: &HashMap<String, Vec<String>>,
) -> Vec<MappingSuggestion> {
    // Score every (field, header) pair, then assign greedily by confidence
    // so one column cannot win several fields.
    let mut candidates: Vec<(usize, usize, f64)> = Vec::new();
    for (field_idx, field) in FIELD_DICTIONARY.iter().enumerate() {
        for (header_idx, header) in headers.iter().enumerate() {
            let sample = samples.get(header).map(Vec::as_slice).unwrap_or(&[]);
            let score = score_header(field, header, sample);
            if score >= MIN_CONFIDENCE {
                candidates.push((field_idx, header_idx, score));
            }
        }
    }
    candidates.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    let mut by_field: HashMap<usize, (usize, f64)> = HashMap::new();
    let mut taken_headers: HashSet<usize> = HashSet::new();
    for (field_idx, header_idx, score) in candidates {
        if by_field.contains_key(&field_idx) || taken_headers.contains(&header_idx) {
            continue;
        }
        by_field.insert(field_idx, (header_idx, score));
        taken_headers.insert(header_idx);
    }

    FIELD_DICTIONARY
        .iter()
        .enumerate()
        .map(|(field_idx, field)| match by_field.get(&field_idx) {
            Some((header_idx, score)) => MappingSuggestion {
                target_field: field.name.to_string(),
                source_column: Some(headers[*header_idx].clone()),
                confidence: (*score * 100.0).round() / 100.0,
            },
            None => MappingSuggestion {
                target_field: field.name.to_string(),
                source_column: None,
                confidence: 0.0,
            },
        })
        .collect()
}

fn score_header(field: &FieldSpec, header: &str, sample: &[String]) -> f64 {
    let normalized = normalize(header);
    if normalized.is_empty() {
        return 0.0;
    }

    let mut best: f64 = 0.0;
    for candidate in std::iter::once(field.name).chain(field.synonyms.iter().copied()) {
        let target = normalize(candidate);
        let score = if normalized == target {
            1.0
        } else if is_prefix_pair(&normalized, &target) {
            jaro_winkler(&normalized, &target).max(PREFIX_FLOOR)
        } else {
            jaro_winkler(&normalized, &target)
        };
        best = best.max(score);
    }

    apply_type_signature(best, field.data_type, sample)
}

/// Boosts fields whose expected type matches the sampled values, and damps
/// typed fields whose samples never parse.
fn apply_type_signature(score: f64, data_type: DataType, sample: &[String]) -> f64 {
    let values: Vec<&String> = sample
        .iter()
        .filter(|v| !v.trim().is_empty())
        .take(SAMPLE_LIMIT)
        .collect();
    if values.is_empty() || data_type == DataType::Text {
        return score;
    }

    let matching = values
        .iter()
        .filter(|v| data_type.matches_sample(v))
        .count();
    if matching == values.len() {
        (score * TYPE_MATCH_BOOST).min(1.0)
    } else if matching == 0 {
        score * TYPE_MISMATCH_PENALTY
    } else {
        score
    }
}

fn is_prefix_pair(a: &str, b: &str) -> bool {
    let shorter = a.len().min(b.len());
    shorter >= 3 && (a.starts_with(b) || b.starts_with(a))
}

/// Case-folds, strips diacritics on common Latin letters, and collapses
/// punctuation runs into single spaces.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.to_lowercase().chars() {
        match c {
            'ä' | 'à' | 'á' | 'â' | 'ã' | 'å' => out.push('a'),
            'ö' | 'ò' | 'ó' | 'ô' | 'õ' => out.push('o'),
            'ü' | 'ù' | 'ú' | 'û' => out.push('u'),
            'è' | 'é' | 'ê' | 'ë' => out.push('e'),
            'ì' | 'í' | 'î' | 'ï' => out.push('i'),
            'ç' => out.push('c'),
            'ñ' => out.push('n'),
            'ß' => out.push_str("ss"),
            c if c.is_alphanumeric() => out.push(c),
            _ => out.push(' '),
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
