//! In-process document store.
//!
//! Evaluates the subset of the query DSL that the builders in
//! [`crate::query`] emit: `match_all`, `bool` (must / filter / should /
//! must_not), `match`, `multi_match` with field boosts, `term`, `terms`
//! and `exists`; `terms` aggregations; field and `_score` sorting;
//! `from`/`size` paging; line-fragment highlighting.
//!
//! Text matching tokenizes on non-alphanumeric characters (underscore kept)
//! and compares lowercase tokens. Scores are the number of matched query
//! tokens times the field boost, so ranking is stable but not BM25.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::StoreError;
use crate::store::{
    DocumentStore, RawAggregation, RawBucket, RawHit, RawHits, RawSearchResponse, RawTotal,
};

const DEFAULT_SIZE: usize = 10;
const DEFAULT_AGG_SIZE: usize = 10;

#[derive(Debug, Clone)]
struct StoredDocument {
    body: Value,
    /// Insertion sequence; breaks sort ties
    seq: u64,
}

type Index = BTreeMap<String, StoredDocument>;

/// Document store holding everything in memory.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    indices: RwLock<HashMap<String, Index>>,
    sequence: AtomicU64,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored body of a document, if present.
    pub fn get(&self, index: &str, id: &str) -> Option<Value> {
        let indices = self.indices.read().ok()?;
        indices.get(index)?.get(id).map(|d| d.body.clone())
    }

    /// Number of documents in an index (0 when missing).
    pub fn len(&self, index: &str) -> usize {
        self.indices
            .read()
            .map(|i| i.get(index).map(|docs| docs.len()).unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, index: &str) -> bool {
        self.len(index) == 0
    }

    /// Sorted ids of every document in an index.
    pub fn ids(&self, index: &str) -> Vec<String> {
        self.indices
            .read()
            .map(|i| {
                i.get(index)
                    .map(|docs| docs.keys().cloned().collect())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    fn poisoned() -> StoreError {
        StoreError::Unavailable("memory store lock poisoned".to_string())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn upsert(&self, index: &str, id: &str, body: &Value) -> Result<(), StoreError> {
        let seq = self.sequence.fetch_add(1, AtomicOrdering::SeqCst);
        let mut indices = self.indices.write().map_err(|_| Self::poisoned())?;
        indices.entry(index.to_string()).or_default().insert(
            id.to_string(),
            StoredDocument {
                body: body.clone(),
                seq,
            },
        );
        debug!(index, id, "Upserted document");
        Ok(())
    }

    async fn delete(&self, index: &str, id: &str) -> Result<(), StoreError> {
        let mut indices = self.indices.write().map_err(|_| Self::poisoned())?;
        indices
            .get_mut(index)
            .and_then(|docs| docs.remove(id))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn search(&self, index: &str, body: &Value) -> Result<RawSearchResponse, StoreError> {
        let indices = self.indices.read().map_err(|_| Self::poisoned())?;
        let docs = indices
            .get(index)
            .ok_or_else(|| StoreError::NotFound(index.to_string()))?;
        Ok(execute(docs, body))
    }

    async fn index_exists(&self, index: &str) -> Result<bool, StoreError> {
        let indices = self.indices.read().map_err(|_| Self::poisoned())?;
        Ok(indices.contains_key(index))
    }

    async fn create_index(&self, index: &str, _settings: &Value) -> Result<(), StoreError> {
        let mut indices = self.indices.write().map_err(|_| Self::poisoned())?;
        if indices.contains_key(index) {
            return Err(StoreError::Status {
                status: 400,
                body: format!("index {} already exists", index),
            });
        }
        indices.insert(index.to_string(), Index::new());
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), StoreError> {
        let mut indices = self.indices.write().map_err(|_| Self::poisoned())?;
        indices
            .remove(index)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(index.to_string()))
    }

    async fn refresh(&self, index: &str) -> Result<(), StoreError> {
        let indices = self.indices.read().map_err(|_| Self::poisoned())?;
        if indices.contains_key(index) {
            Ok(())
        } else {
            Err(StoreError::NotFound(index.to_string()))
        }
    }
}

struct Matched<'a> {
    id: &'a str,
    doc: &'a StoredDocument,
    score: f64,
}

fn execute(docs: &Index, body: &Value) -> RawSearchResponse {
    let match_all = serde_json::json!({"match_all": {}});
    let query = body.get("query").unwrap_or(&match_all);

    let mut matched: Vec<Matched<'_>> = docs
        .iter()
        .filter_map(|(id, doc)| {
            evaluate(query, &doc.body).map(|score| Matched {
                id: id.as_str(),
                doc,
                score,
            })
        })
        .collect();

    let aggregations = aggregate(body.get("aggs"), &matched);
    sort_matches(&mut matched, body.get("sort"));

    let total = matched.len() as u64;
    let from = body.get("from").and_then(Value::as_u64).unwrap_or(0) as usize;
    let size = body
        .get("size")
        .and_then(Value::as_u64)
        .map(|s| s as usize)
        .unwrap_or(DEFAULT_SIZE);

    let terms = query_terms(query);
    let hits = matched
        .into_iter()
        .skip(from)
        .take(size)
        .map(|m| RawHit {
            id: m.id.to_string(),
            score: Some(m.score),
            source: m.doc.body.clone(),
            highlight: highlight(body.get("highlight"), &m.doc.body, &terms),
        })
        .collect();

    RawSearchResponse {
        hits: RawHits {
            total: RawTotal::Object { value: total },
            hits,
        },
        aggregations,
    }
}

/// Single-key object `{kind: params}`.
fn clause_kind(query: &Value) -> Option<(&str, &Value)> {
    let object = query.as_object()?;
    object.iter().next().map(|(k, v)| (k.as_str(), v))
}

fn clauses(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => vec![other],
    }
}

/// Score of `doc` against `query`, or `None` when it does not match.
fn evaluate(query: &Value, doc: &Value) -> Option<f64> {
    let (kind, params) = clause_kind(query)?;
    match kind {
        "match_all" => Some(1.0),
        "bool" => evaluate_bool(params, doc),
        "match" => {
            let (field, spec) = clause_kind(params)?;
            let (text, operator) = match spec {
                Value::String(s) => (s.as_str(), "or"),
                other => (
                    other.get("query")?.as_str()?,
                    other.get("operator").and_then(Value::as_str).unwrap_or("or"),
                ),
            };
            text_score(doc, text, operator, &[(field.to_string(), 1.0)])
        }
        "multi_match" => {
            let text = params.get("query")?.as_str()?;
            let operator = params
                .get("operator")
                .and_then(Value::as_str)
                .unwrap_or("or");
            let fields: Vec<(String, f64)> = params
                .get("fields")?
                .as_array()?
                .iter()
                .filter_map(Value::as_str)
                .map(parse_boost)
                .collect();
            text_score(doc, text, operator, &fields)
        }
        "term" => {
            let (field, spec) = clause_kind(params)?;
            let expected = spec.get("value").unwrap_or(spec);
            let expected = scalar_string(expected)?;
            field_values(doc, field)
                .iter()
                .any(|v| *v == expected)
                .then_some(1.0)
        }
        "terms" => {
            let (field, values) = clause_kind(params)?;
            let expected: HashSet<String> = values
                .as_array()?
                .iter()
                .filter_map(scalar_string)
                .collect();
            field_values(doc, field)
                .iter()
                .any(|v| expected.contains(v))
                .then_some(1.0)
        }
        "exists" => {
            let field = params.get("field")?.as_str()?;
            (!field_values(doc, field).is_empty()).then_some(1.0)
        }
        _ => None,
    }
}

fn evaluate_bool(params: &Value, doc: &Value) -> Option<f64> {
    let must = clauses(params.get("must"));
    let filter = clauses(params.get("filter"));
    let should = clauses(params.get("should"));

    let mut score = 0.0;
    for clause in &must {
        score += evaluate(clause, doc)?;
    }
    for clause in &filter {
        evaluate(clause, doc)?;
    }
    for clause in clauses(params.get("must_not")) {
        if evaluate(clause, doc).is_some() {
            return None;
        }
    }

    let mut should_matched = false;
    for clause in &should {
        if let Some(s) = evaluate(clause, doc) {
            score += s;
            should_matched = true;
        }
    }
    if !should.is_empty() && must.is_empty() && filter.is_empty() && !should_matched {
        return None;
    }
    Some(score)
}

/// `"message^10"` -> `("message", 10.0)`.
fn parse_boost(field: &str) -> (String, f64) {
    match field.split_once('^') {
        Some((name, boost)) => (name.to_string(), boost.parse().unwrap_or(1.0)),
        None => (field.to_string(), 1.0),
    }
}

fn text_score(doc: &Value, text: &str, operator: &str, fields: &[(String, f64)]) -> Option<f64> {
    let wanted = tokenize(text);
    if wanted.is_empty() {
        return None;
    }
    let require_all = operator.eq_ignore_ascii_case("and");

    let mut best: Option<f64> = None;
    for (field, boost) in fields {
        let present: HashSet<String> = field_values(doc, field)
            .iter()
            .flat_map(|v| tokenize(v))
            .collect();
        let hits = wanted.iter().filter(|t| present.contains(*t)).count();
        let ok = if require_all {
            hits == wanted.len()
        } else {
            hits > 0
        };
        if ok {
            let score = hits as f64 * boost;
            best = Some(best.map_or(score, |b: f64| b.max(score)));
        }
    }
    best
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn lookup<'a>(doc: &'a Value, field: &str) -> Option<&'a Value> {
    field.split('.').try_fold(doc, |value, key| value.get(key))
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Scalar values at a dotted path, arrays flattened.
fn field_values(doc: &Value, field: &str) -> Vec<String> {
    match lookup(doc, field) {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_string).collect(),
        Some(value) => scalar_string(value).into_iter().collect(),
        None => Vec::new(),
    }
}

fn aggregate(aggs: Option<&Value>, matched: &[Matched<'_>]) -> HashMap<String, RawAggregation> {
    let Some(aggs) = aggs.and_then(Value::as_object) else {
        return HashMap::new();
    };

    let mut result = HashMap::new();
    for (name, spec) in aggs {
        let Some(terms) = spec.get("terms") else {
            continue;
        };
        let Some(field) = terms.get("field").and_then(Value::as_str) else {
            continue;
        };
        let size = terms
            .get("size")
            .and_then(Value::as_u64)
            .map(|s| s as usize)
            .unwrap_or(DEFAULT_AGG_SIZE);

        let mut counts: HashMap<String, u64> = HashMap::new();
        for m in matched {
            let values: HashSet<String> = field_values(&m.doc.body, field).into_iter().collect();
            for value in values {
                *counts.entry(value).or_insert(0) += 1;
            }
        }

        let mut buckets: Vec<RawBucket> = counts
            .into_iter()
            .map(|(key, doc_count)| RawBucket {
                key: Value::String(key),
                doc_count,
            })
            .collect();
        buckets.sort_by(|a, b| {
            b.doc_count
                .cmp(&a.doc_count)
                .then_with(|| a.key_string().cmp(&b.key_string()))
        });
        buckets.truncate(size);
        result.insert(name.clone(), RawAggregation { buckets });
    }
    result
}

enum SortKey {
    Score,
    Field { name: String, descending: bool },
}

fn sort_keys(sort: Option<&Value>) -> Vec<SortKey> {
    let mut keys = Vec::new();
    for entry in clauses(sort) {
        match entry {
            Value::String(s) if s == "_score" => keys.push(SortKey::Score),
            Value::String(s) => keys.push(SortKey::Field {
                name: s.clone(),
                descending: false,
            }),
            Value::Object(map) => {
                for (name, spec) in map {
                    let order = spec
                        .get("order")
                        .and_then(Value::as_str)
                        .or_else(|| spec.as_str())
                        .unwrap_or("asc");
                    let descending = order.eq_ignore_ascii_case("desc");
                    if name == "_score" {
                        keys.push(SortKey::Score);
                    } else {
                        keys.push(SortKey::Field {
                            name: name.clone(),
                            descending,
                        });
                    }
                }
            }
            _ => {}
        }
    }
    if keys.is_empty() {
        keys.push(SortKey::Score);
    }
    keys
}

fn sort_matches(matched: &mut [Matched<'_>], sort: Option<&Value>) {
    let keys = sort_keys(sort);
    matched.sort_by(|a, b| {
        for key in &keys {
            let ordering = match key {
                SortKey::Score => b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal),
                SortKey::Field { name, descending } => {
                    let ordering = compare_values(lookup(&a.doc.body, name), lookup(&b.doc.body, name));
                    if *descending {
                        ordering.reverse()
                    } else {
                        ordering
                    }
                }
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        a.doc.seq.cmp(&b.doc.seq)
    });
}

/// Missing values sort after present ones.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(x), Some(y)) => scalar_string(x).cmp(&scalar_string(y)),
    }
}

/// Lowercase tokens of every text clause in a query.
fn query_terms(query: &Value) -> HashSet<String> {
    let mut terms = HashSet::new();
    collect_terms(query, &mut terms);
    terms
}

fn collect_terms(query: &Value, terms: &mut HashSet<String>) {
    let Some((kind, params)) = clause_kind(query) else {
        return;
    };
    match kind {
        "bool" => {
            for key in ["must", "should"] {
                for clause in clauses(params.get(key)) {
                    collect_terms(clause, terms);
                }
            }
        }
        "match" => {
            if let Some((_, spec)) = clause_kind(params) {
                let text = spec.as_str().or_else(|| spec.get("query").and_then(Value::as_str));
                terms.extend(text.map(tokenize).unwrap_or_default());
            }
        }
        "multi_match" => {
            let text = params.get("query").and_then(Value::as_str);
            terms.extend(text.map(tokenize).unwrap_or_default());
        }
        _ => {}
    }
}

fn highlight(
    spec: Option<&Value>,
    doc: &Value,
    terms: &HashSet<String>,
) -> HashMap<String, Vec<String>> {
    let mut result = HashMap::new();
    let Some(spec) = spec else {
        return result;
    };
    if terms.is_empty() {
        return result;
    }

    let first_tag = |key: &str, default: &str| {
        spec.get(key)
            .and_then(Value::as_array)
            .and_then(|tags| tags.first())
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    };
    let pre = first_tag("pre_tags", "<em>");
    let post = first_tag("post_tags", "</em>");

    let Some(fields) = spec.get("fields").and_then(Value::as_object) else {
        return result;
    };
    for field in fields.keys() {
        let Some(text) = lookup(doc, field).and_then(Value::as_str) else {
            continue;
        };
        let fragments: Vec<String> = text
            .lines()
            .filter_map(|line| highlight_line(line, terms, &pre, &post))
            .collect();
        if !fragments.is_empty() {
            result.insert(field.clone(), fragments);
        }
    }
    result
}

/// Wrap matching tokens of one line, or `None` if nothing matches.
fn highlight_line(line: &str, terms: &HashSet<String>, pre: &str, post: &str) -> Option<String> {
    let mut out = String::with_capacity(line.len());
    let mut token_start: Option<usize> = None;
    let mut found = false;

    let flush = |out: &mut String, token: &str, found: &mut bool| {
        if terms.contains(&token.to_lowercase()) {
            out.push_str(pre);
            out.push_str(token);
            out.push_str(post);
            *found = true;
        } else {
            out.push_str(token);
        }
    };

    for (i, c) in line.char_indices() {
        let is_token = c.is_alphanumeric() || c == '_';
        match (is_token, token_start) {
            (true, None) => token_start = Some(i),
            (false, Some(start)) => {
                flush(&mut out, &line[start..i], &mut found);
                token_start = None;
                out.push(c);
            }
            (false, None) => out.push(c),
            (true, Some(_)) => {}
        }
    }
    if let Some(start) = token_start {
        flush(&mut out, &line[start..], &mut found);
    }

    found.then_some(out)
}
