//! Index settings and mappings.
//!
//! One index holds both document kinds. Analyzers:
//! - `human_analyzer`: 1-20 char n-grams for names and emails
//! - `sha_analyzer`: 8-40 char edge n-grams so abbreviated shas match
//! - `path_analyzer`: reversed path hierarchy with edge n-grams
//! - `code_analyzer`: standard tokens, lowercased, ascii-folded, lightly stemmed

use serde_json::{json, Value};

/// Body for index creation.
pub fn index_settings() -> Value {
    json!({
        "settings": {
            "index": {
                "max_ngram_diff": 39,
                "analysis": analysis()
            }
        },
        "mappings": mappings()
    })
}

fn analysis() -> Value {
    json!({
        "analyzer": {
            "human_analyzer": {
                "type": "custom",
                "tokenizer": "human_tokenizer",
                "filter": ["lowercase", "asciifolding"]
            },
            "sha_analyzer": {
                "type": "custom",
                "tokenizer": "sha_tokenizer",
                "filter": ["lowercase", "asciifolding"]
            },
            "path_analyzer": {
                "type": "custom",
                "tokenizer": "path_tokenizer",
                "filter": ["lowercase", "asciifolding", "path_ngram"]
            },
            "code_analyzer": {
                "type": "custom",
                "tokenizer": "standard",
                "filter": ["lowercase", "asciifolding", "code_stemmer"]
            }
        },
        "tokenizer": {
            "human_tokenizer": {
                "type": "ngram",
                "min_gram": 1,
                "max_gram": 20,
                "token_chars": ["letter", "digit"]
            },
            "sha_tokenizer": {
                "type": "edge_ngram",
                "min_gram": 8,
                "max_gram": 40,
                "token_chars": ["letter", "digit"]
            },
            "path_tokenizer": {
                "type": "path_hierarchy",
                "reverse": true
            }
        },
        "filter": {
            "path_ngram": {
                "type": "edge_ngram",
                "min_gram": 3,
                "max_gram": 15
            },
            "code_stemmer": {
                "type": "stemmer",
                "name": "minimal_english"
            }
        }
    })
}

fn signature() -> Value {
    json!({
        "properties": {
            "name": {"type": "text", "analyzer": "human_analyzer", "search_analyzer": "standard"},
            "email": {"type": "text", "analyzer": "human_analyzer", "search_analyzer": "standard"},
            "time": {"type": "date"}
        }
    })
}

fn mappings() -> Value {
    json!({
        "properties": {
            "type": {"type": "keyword"},
            "indexed_at": {"type": "date", "format": "epoch_millis"},
            "blob": {
                "properties": {
                    "oid": {"type": "keyword"},
                    "rid": {"type": "keyword"},
                    "commit_sha": {"type": "keyword"},
                    "path": {"type": "text", "analyzer": "path_analyzer"},
                    "content": {
                        "type": "text",
                        "analyzer": "code_analyzer",
                        "term_vector": "with_positions_offsets"
                    },
                    "language": {"type": "keyword"},
                    "size": {"type": "long"},
                    "mode": {"type": "integer"}
                }
            },
            "commit": {
                "properties": {
                    "rid": {"type": "keyword"},
                    "sha": {"type": "text", "analyzer": "sha_analyzer", "search_analyzer": "standard"},
                    "author": signature(),
                    "committer": signature(),
                    "message": {
                        "type": "text",
                        "analyzer": "code_analyzer",
                        "term_vector": "with_positions_offsets"
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filterable_fields_are_keywords() {
        let settings = index_settings();
        let props = &settings["mappings"]["properties"];
        assert_eq!(props["type"]["type"], "keyword");
        assert_eq!(props["blob"]["properties"]["rid"]["type"], "keyword");
        assert_eq!(props["blob"]["properties"]["language"]["type"], "keyword");
        assert_eq!(props["commit"]["properties"]["rid"]["type"], "keyword");
    }

    #[test]
    fn test_highlighted_fields_store_offsets() {
        let settings = index_settings();
        let props = &settings["mappings"]["properties"];
        assert_eq!(
            props["blob"]["properties"]["content"]["term_vector"],
            "with_positions_offsets"
        );
        assert_eq!(
            props["commit"]["properties"]["message"]["term_vector"],
            "with_positions_offsets"
        );
    }

    #[test]
    fn test_sha_edge_ngrams() {
        let settings = index_settings();
        let sha = &settings["settings"]["index"]["analysis"]["tokenizer"]["sha_tokenizer"];
        assert_eq!(sha["min_gram"], 8);
        assert_eq!(sha["max_gram"], 40);
    }
}
