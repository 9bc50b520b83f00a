//! Offline SQL generation used when no Anthropic credential is configured.
//!
//! A small keyword table over the citydb schema keeps the query endpoint
//! usable end-to-end without network access. Output is deterministic.

use async_trait::async_trait;

use crate::{Generation, GenerationMode, GeneratorError, SqlGenerator};

struct Canned {
    keywords: &'static [&'static str],
    sql: &'static str,
    explanation: &'static str,
}

const CANNED: &[Canned] = &[
    Canned {
        keywords: &["tallest", "highest", "height"],
        sql: "SELECT co.gmlid, co.name, b.measured_height \
              FROM citydb.building b \
              JOIN citydb.cityobject co ON co.id = b.id \
              WHERE b.building_root_id = b.id AND b.measured_height IS NOT NULL \
              ORDER BY b.measured_height DESC \
              LIMIT 10",
        explanation: "Lists the ten tallest buildings by measured height.",
    },
    Canned {
        keywords: &["usage", "use", "kind", "type"],
        sql: "SELECT b.usage, COUNT(*) AS building_count \
              FROM citydb.building b \
              WHERE b.building_root_id = b.id \
              GROUP BY b.usage \
              ORDER BY building_count DESC \
              LIMIT 50",
        explanation: "Counts buildings grouped by their usage code.",
    },
    Canned {
        keywords: &["storey", "story", "floor"],
        sql: "SELECT co.gmlid, co.name, b.storeys_above_ground \
              FROM citydb.building b \
              JOIN citydb.cityobject co ON co.id = b.id \
              WHERE b.building_root_id = b.id \
                AND b.storeys_above_ground IS NOT NULL \
                AND b.storeys_above_ground <> 9999 \
              ORDER BY b.storeys_above_ground DESC \
              LIMIT 10",
        explanation: "Lists buildings with the most storeys above ground.",
    },
];

const FALLBACK_SQL: &str = "SELECT COUNT(*) AS building_count \
                            FROM citydb.building b \
                            WHERE b.building_root_id = b.id";
const FALLBACK_EXPLANATION: &str = "Counts the root buildings in the model.";

/// Keyword-matched canned queries. Always answers; never calls out.
pub struct PlaceholderGenerator;

#[async_trait]
impl SqlGenerator for PlaceholderGenerator {
    async fn generate(&self, question: &str) -> Result<Generation, GeneratorError> {
        let lowered = question.to_lowercase();
        let canned = CANNED
            .iter()
            .find(|c| c.keywords.iter().any(|kw| lowered.contains(kw)));

        let (sql, explanation) = match canned {
            Some(c) => (c.sql, c.explanation),
            None => (FALLBACK_SQL, FALLBACK_EXPLANATION),
        };

        Ok(Generation {
            sql: sql.to_string(),
            explanation: format!("{explanation} (placeholder mode, no API key configured)"),
            mode: GenerationMode::Placeholder,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn height_question_matches_tallest_query() {
        let generation = PlaceholderGenerator
            .generate("What are the tallest buildings in Taito-ku?")
            .await
            .unwrap();
        assert!(generation.sql.contains("ORDER BY b.measured_height DESC"));
        assert_eq!(generation.mode, GenerationMode::Placeholder);
    }

    #[tokio::test]
    async fn unknown_question_falls_back_to_count() {
        let generation = PlaceholderGenerator
            .generate("何かおもしろいことを教えて")
            .await
            .unwrap();
        assert!(generation.sql.starts_with("SELECT COUNT(*)"));
    }

    #[tokio::test]
    async fn placeholder_sql_passes_the_gate() {
        for question in ["tallest?", "usage breakdown", "how many storeys", "anything"] {
            let generation = PlaceholderGenerator.generate(question).await.unwrap();
            citycontext_core::validate(&generation.sql, 1000).expect("canned SQL must validate");
        }
    }
}
