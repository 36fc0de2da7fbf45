//! Report synthesis from accumulated session findings.

use crate::knowledge::Contradiction;
use crate::scoring::RelevanceCategory;
use crate::session::budget::BudgetUsage;
use crate::session::state::Fact;
use crate::types::{Report, ReportFormat, SourceRecord};

/// Everything the synthesizer needs from a finished session.
pub struct SynthesisInput<'a> {
    pub query: &'a str,
    pub facts: &'a [Fact],
    pub sources: &'a [SourceRecord],
    pub contradictions: &'a [Contradiction],
    pub usage: BudgetUsage,
}

/// Pluggable report generator.
pub trait Synthesizer: Send + Sync {
    fn synthesize(&self, input: &SynthesisInput<'_>, format: ReportFormat) -> Report;
}

/// Deterministic markdown report generator.
pub struct TemplateSynthesizer;

impl TemplateSynthesizer {
    pub fn new() -> Self {
        Self
    }

    fn overall_confidence(facts: &[Fact]) -> f64 {
        if facts.is_empty() {
            return 0.0;
        }
        facts.iter().map(|f| f.confidence).sum::<f64>() / facts.len() as f64
    }

    fn fact_section(out: &mut String, heading: &str, facts: &[&Fact]) {
        if facts.is_empty() {
            return;
        }
        out.push_str(&format!("\n## {heading}\n\n"));
        let mut sorted = facts.to_vec();
        sorted.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        for fact in sorted {
            out.push_str(&format!(
                "- {} _(confidence {:.2})_\n",
                fact.content, fact.confidence
            ));
        }
    }
}

impl Default for TemplateSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Synthesizer for TemplateSynthesizer {
    fn synthesize(&self, input: &SynthesisInput<'_>, format: ReportFormat) -> Report {
        let confidence = Self::overall_confidence(input.facts);

        let core: Vec<&Fact> = input
            .facts
            .iter()
            .filter(|f| f.category == RelevanceCategory::Core)
            .collect();
        let peripheral: Vec<&Fact> = input
            .facts
            .iter()
            .filter(|f| f.category == RelevanceCategory::Peripheral)
            .collect();

        let mut content = format!("# Research: {}\n", input.query);

        match format {
            ReportFormat::Summary => {
                content.push_str(&format!(
                    "\n{} findings from {} sources (overall confidence {:.2}).\n",
                    input.facts.len(),
                    input.sources.len(),
                    confidence,
                ));
                Self::fact_section(&mut content, "Key findings", &core);
                if !input.contradictions.is_empty() {
                    content.push_str(&format!(
                        "\n{} unresolved contradiction(s) were found; see the detailed report.\n",
                        input.contradictions.len(),
                    ));
                }
            }
            ReportFormat::DetailedReport => {
                Self::fact_section(&mut content, "Key findings", &core);
                Self::fact_section(&mut content, "Supporting findings", &peripheral);

                if !input.contradictions.is_empty() {
                    content.push_str("\n## Contradictions\n\n");
                    for c in input.contradictions {
                        content.push_str(&format!(
                            "- \"{}\" vs \"{}\" (strength {:.2})\n",
                            c.claim_a_statement, c.claim_b_statement, c.strength,
                        ));
                    }
                }

                if !input.sources.is_empty() {
                    content.push_str("\n## Sources\n\n");
                    let mut sources = input.sources.to_vec();
                    sources.sort_by(|a, b| {
                        b.credibility
                            .partial_cmp(&a.credibility)
                            .unwrap_or(std::cmp::Ordering::Equal)
                    });
                    for source in &sources {
                        match &source.url {
                            Some(url) => content.push_str(&format!(
                                "- [{}]({}) — credibility {:.2}\n",
                                source.title, url, source.credibility,
                            )),
                            None => content.push_str(&format!(
                                "- {} — credibility {:.2}\n",
                                source.title, source.credibility,
                            )),
                        }
                    }
                }

                content.push_str(&format!(
                    "\n## Methodology\n\n\
                     {} iteration(s), {} retrieval call(s), ~{} tokens read, {} ms elapsed.\n",
                    input.usage.iterations,
                    input.usage.api_calls,
                    input.usage.tokens_used,
                    input.usage.elapsed_ms,
                ));
            }
        }

        Report {
            query: input.query.to_string(),
            format,
            content,
            confidence,
            sources_cited: input.sources.len(),
            contradictions_found: input.contradictions.len(),
        }
    }
}
