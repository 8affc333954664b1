//! The Director: one structured call turning a brief plus research context
//! into exactly four strategically distinct directions. Structural
//! invariants and anti-cliché rules are validated post-parse; violations
//! consume schema-repair attempts, and locked copy is stamped over the
//! output so the byte-equality guarantee never depends on model obedience.

use crate::brief::Brief;
use crate::direction::{directions_schema, BrandDirection, BrandDirectionsOutput};
use crate::error::{DirectorError, ModelError, PipelineError};
use crate::model::{self, TextModel};
use crate::research::ResearchSummary;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

const REPAIR_ATTEMPTS: u32 = 2;

pub const SYSTEM_PROMPT: &str = "\
You are a world-class Creative Director with 20 years of brand identity \
experience. You think like a strategist, design like a craftsman, and \
communicate like a writer.

Your task: analyze the incoming brand brief and generate exactly FOUR \
distinct brand identity directions, emitted in this fixed positional order:

Option 1 — Market-Aligned. Meet category expectations with craft: what do \
successful players in this market look like, executed well.
Option 2 — Designer-Led. If references are provided, follow them \
faithfully; otherwise the most aesthetically elevated version of the brand \
on pure design sensibility.
Option 3 — Hybrid. A deliberate balance: say what is borrowed from \
convention for trust and what is differentiated for personality.
Option 4 — Wild-Card. Break from the brief's explicit direction with an \
unexpected proposal that might be exactly right.

THE CARDINAL RULE OF CONCEPT QUALITY: before writing any visual spec, ask \
whether it is the first thing anyone would think of. If yes, reject it and \
go deeper. The best logos do not show what the brand does — they show what \
it MEANS. If the brief carries a CREATIVE CONSTRAINTS block, its forbidden \
visuals are hard rules: any of them appearing in logo_spec.form or metaphor \
means your output is rejected.

Palette rules: 4-6 colors per direction, roles covering at least primary, \
neutral-dark, and neutral-light. Every hex is #RRGGBB.

Divergence rule: no two directions may share both the same primary hue \
family AND the same logo_type.

COPY OVERRIDE RULE: if the brief contains a PRE-WRITTEN COPY section, those \
values are locked — reproduce them verbatim in tagline / ad_slogan / \
announcement_copy for EVERY direction. Otherwise generate copy freely: \
tagline 5-10 words, ad_slogan 3-6 words, announcement_copy 10-18 words.

Every spec field must be precise and direction-specific. Vague values \
produce unusable assets.";

// ─── Industry cliché database ────────────────────────────────────────────────

struct IndustryCliches {
    industry: &'static str,
    avoid: &'static [&'static str],
    lateral: &'static [&'static str],
}

const INDUSTRY_CLICHES: &[IndustryCliches] = &[
    IndustryCliches {
        industry: "coffee",
        avoid: &[
            "coffee bean", "coffee cup", "mug", "steam", "espresso drip", "roasting drum",
            "coffee plant", "sunrise over plantation",
        ],
        lateral: &[
            "terroir — contour lines of highland geography",
            "the ritual: the specific gesture of brewing",
            "transformation — the moment green bean becomes roasted",
            "the pause — silence and slowness as a concept",
            "typographic mark using the brand initial with editorial weight",
        ],
    },
    IndustryCliches {
        industry: "tea",
        avoid: &["tea leaf", "teacup", "teapot", "steam from teapot", "zen circle"],
        lateral: &[
            "the steeping moment — suspension in water",
            "garden topography, terraced hillside",
            "ceramic texture",
        ],
    },
    IndustryCliches {
        industry: "tech",
        avoid: &[
            "circuit board", "binary code", "lightbulb", "neural network diagram", "rocket",
            "wifi arc", "globe with latitude lines", "gear",
        ],
        lateral: &[
            "the human behavior the product enables, not the product itself",
            "invisible infrastructure made visible through abstraction",
            "the moment of insight as negative space",
            "architectural precision: grid, module, ratio",
        ],
    },
    IndustryCliches {
        industry: "food",
        avoid: &["fork and spoon", "chef hat", "plate", "flame", "generic herb sprig"],
        lateral: &[
            "texture of the ingredient at macro scale",
            "the craft: fermentation, fire, aging",
            "the moment before eating — anticipation",
        ],
    },
    IndustryCliches {
        industry: "finance",
        avoid: &[
            "upward arrow", "growth chart", "dollar sign", "scales of balance", "handshake",
            "shield", "stacked coins",
        ],
        lateral: &[
            "flow and momentum as abstract line",
            "architectural stability: column, vault, grid",
            "quiet confidence: a typographic mark, no icon",
        ],
    },
    IndustryCliches {
        industry: "healthcare",
        avoid: &["red cross", "heartbeat line", "stethoscope", "pill", "dna helix", "caduceus"],
        lateral: &[
            "light and clarity — openness as trust",
            "the breath: rhythm, interval",
            "typographic mark with humanist weight",
        ],
    },
    IndustryCliches {
        industry: "fashion",
        avoid: &["needle and thread", "mannequin", "hanger", "scissors", "sewing machine"],
        lateral: &[
            "material texture at extreme close-up",
            "editorial negative space — what is not there",
            "abstract gesture of movement",
        ],
    },
    IndustryCliches {
        industry: "real_estate",
        avoid: &["house outline", "roof", "key", "front door", "skyline", "location pin"],
        lateral: &[
            "threshold — the moment of transition between spaces",
            "light through architecture: openings, planes",
            "plan view abstracted to geometry",
        ],
    },
    IndustryCliches {
        industry: "education",
        avoid: &["graduation cap", "open book", "pencil", "apple on desk", "owl", "lightbulb"],
        lateral: &[
            "curiosity as gesture: reaching, leaning forward",
            "growth from inside: emergence, unfolding",
            "the structure of knowledge: modular, layered",
        ],
    },
    IndustryCliches {
        industry: "wellness",
        avoid: &["lotus flower", "generic leaf", "sunrise", "water drop"],
        lateral: &[
            "breath and rhythm: wave, interval",
            "the pause — stillness made visual",
            "earth and material: texture, ground",
        ],
    },
];

const KEYWORD_INDUSTRY_MAP: &[(&str, &str)] = &[
    ("coffee", "coffee"),
    ("cafe", "coffee"),
    ("espresso", "coffee"),
    ("roastery", "coffee"),
    ("tea", "tea"),
    ("matcha", "tea"),
    ("tech", "tech"),
    ("saas", "tech"),
    ("software", "tech"),
    ("app", "tech"),
    ("fintech", "finance"),
    ("crypto", "finance"),
    ("finance", "finance"),
    ("food", "food"),
    ("restaurant", "food"),
    ("bakery", "food"),
    ("health", "healthcare"),
    ("medical", "healthcare"),
    ("clinic", "healthcare"),
    ("fashion", "fashion"),
    ("clothing", "fashion"),
    ("apparel", "fashion"),
    ("estate", "real_estate"),
    ("property", "real_estate"),
    ("education", "education"),
    ("school", "education"),
    ("learning", "education"),
    ("wellness", "wellness"),
    ("yoga", "wellness"),
    ("spa", "wellness"),
];

fn matched_industries(brief: &Brief) -> Vec<&'static IndustryCliches> {
    let haystack = format!(
        "{} {} {} {}",
        brief.brand_name,
        brief.product_description,
        brief.core_promise,
        brief.keywords.join(" ")
    )
    .to_ascii_lowercase();

    let mut seen = HashSet::new();
    let mut matched = Vec::new();
    for (keyword, industry) in KEYWORD_INDUSTRY_MAP {
        if haystack.contains(keyword) && seen.insert(*industry) {
            if let Some(entry) = INDUSTRY_CLICHES.iter().find(|c| c.industry == *industry) {
                matched.push(entry);
            }
        }
    }
    matched
}

/// Build the CREATIVE CONSTRAINTS block injected into the user message when
/// the brief maps onto known industries.
fn concept_constraints(brief: &Brief) -> Option<String> {
    let matched = matched_industries(brief);
    if matched.is_empty() {
        return None;
    }
    let mut lines = vec![
        "## CREATIVE CONSTRAINTS — READ BEFORE GENERATING CONCEPTS".to_string(),
        String::new(),
        "A senior Art Director would immediately flag these as overdone. \
         Using any of them means a rejected concept."
            .to_string(),
        String::new(),
    ];
    for entry in &matched {
        lines.push(format!(
            "**{} — FORBIDDEN visuals:** {}",
            entry.industry.replace('_', " "),
            entry.avoid.join(" / ")
        ));
    }
    lines.push(String::new());
    lines.push("## LATERAL TERRITORIES — explore these instead".to_string());
    lines.push(
        "Each direction must use a distinct conceptual territory from this list \
         (or invent one equally unexpected)."
            .to_string(),
    );
    for entry in &matched {
        for territory in entry.lateral {
            lines.push(format!("  - {territory}"));
        }
    }
    Some(lines.join("\n"))
}

/// Scan a direction's logo form and metaphor against the deny lists. The
/// Wild-Card slot gets the strict treatment; other directions may reference
/// the industry as long as the literal motif words stay out of the form.
fn cliche_violation(brief: &Brief, direction: &BrandDirection) -> Option<String> {
    let matched = matched_industries(brief);
    if matched.is_empty() {
        return None;
    }
    let haystack = format!("{} {}", direction.logo_spec.form, direction.logo_spec.metaphor)
        .to_ascii_lowercase();
    for entry in matched {
        for banned in entry.avoid {
            if haystack.contains(&banned.to_ascii_lowercase()) {
                return Some(format!(
                    "option {} uses the banned {} motif {:?} in its logo spec",
                    direction.option_number, entry.industry, banned
                ));
            }
        }
    }
    None
}

// ─── Director ────────────────────────────────────────────────────────────────

pub struct Director {
    text: Arc<dyn TextModel>,
}

impl Director {
    pub fn new(text: Arc<dyn TextModel>) -> Self {
        Self { text }
    }

    fn user_message(
        &self,
        brief: &Brief,
        research: &ResearchSummary,
        style_refs: &[PathBuf],
    ) -> String {
        let mut message = brief.to_prompt_block();
        let research_block = research.to_director_context();
        if !research_block.is_empty() {
            message.push_str("\n\n---\n\n");
            message.push_str(&research_block);
        }
        if !style_refs.is_empty() {
            message.push_str(
                "\n\n---\n\n## STYLE REFERENCE — VISUAL RENDERING ANCHOR\n\
                 The client has selected reference image(s) as their preferred visual \
                 rendering style. ALL 4 directions must render in the same aesthetic: \
                 the concept may differ per direction, but stroke weight, illustration \
                 approach, and detail level must match the references.",
            );
        }
        if let Some(constraints) = concept_constraints(brief) {
            message.push_str("\n\n---\n\n");
            message.push_str(&constraints);
        }
        message
    }

    fn validator<'a>(
        brief: &'a Brief,
    ) -> impl Fn(&BrandDirectionsOutput) -> Result<(), String> + 'a {
        move |output: &BrandDirectionsOutput| {
            output.validate()?;
            for direction in &output.directions {
                if let Some(violation) = cliche_violation(brief, direction) {
                    return Err(violation);
                }
            }
            Ok(())
        }
    }

    fn finalize(
        brief: &Brief,
        mut output: BrandDirectionsOutput,
    ) -> Result<BrandDirectionsOutput, PipelineError> {
        if let Some(copy) = brief.locked() {
            output.apply_locked_copy(copy);
        }
        // The stamp cannot invalidate structure, but re-check anyway: this is
        // the last gate before the record is published downstream.
        output
            .validate()
            .map_err(|reason| PipelineError::Director(DirectorError::OutputInvalid(reason)))?;
        Ok(output)
    }

    /// Generate the four directions for a brief.
    pub async fn generate(
        &self,
        brief: &Brief,
        research: &ResearchSummary,
        style_refs: &[PathBuf],
    ) -> Result<BrandDirectionsOutput, PipelineError> {
        let message = self.user_message(brief, research, style_refs);
        let output: BrandDirectionsOutput = model::structured(
            self.text.as_ref(),
            "director",
            Some(SYSTEM_PROMPT),
            &message,
            &directions_schema(),
            REPAIR_ATTEMPTS,
            Self::validator(brief),
        )
        .await
        .map_err(|err| match err {
            ModelError::SchemaViolation { message, .. } => {
                PipelineError::Director(DirectorError::OutputInvalid(message))
            }
            other => PipelineError::Model(other),
        })?;
        Self::finalize(brief, output)
    }

    /// Refinement mode: regenerate with feedback against a previous output.
    /// Options outside `only_options` (when given) are carried over verbatim
    /// from the previous run; the option-type slots never move.
    pub async fn refine(
        &self,
        brief: &Brief,
        previous: &BrandDirectionsOutput,
        feedback: &str,
        only_options: Option<&[u8]>,
        research: &ResearchSummary,
        style_refs: &[PathBuf],
    ) -> Result<BrandDirectionsOutput, PipelineError> {
        let mut message = self.user_message(brief, research, style_refs);
        message.push_str("\n\n---\n\n## PREVIOUS DIRECTIONS\n");
        message.push_str(
            &serde_json::to_string_pretty(previous)
                .unwrap_or_else(|_| "previous output unavailable".to_string()),
        );
        message.push_str("\n\n## REFINEMENT REQUEST\n");
        message.push_str(feedback);
        match only_options {
            Some(options) => {
                message.push_str(&format!(
                    "\n\nRegenerate ONLY option(s) {:?}; reproduce every other direction \
                     unchanged, field for field. Keep the option-type slots fixed.",
                    options
                ));
            }
            None => {
                message.push_str(
                    "\n\nRevise the directions accordingly. Keep what works, change what \
                     was requested. Keep the option-type slots fixed.",
                );
            }
        }

        let mut output: BrandDirectionsOutput = model::structured(
            self.text.as_ref(),
            "director-refine",
            Some(SYSTEM_PROMPT),
            &message,
            &directions_schema(),
            REPAIR_ATTEMPTS,
            Self::validator(brief),
        )
        .await
        .map_err(|err| match err {
            ModelError::SchemaViolation { message, .. } => {
                PipelineError::Director(DirectorError::OutputInvalid(message))
            }
            other => PipelineError::Model(other),
        })?;

        // Untouched options are carried over from the previous record, not
        // trusted to the model's reproduction.
        if let Some(options) = only_options {
            for direction in &mut output.directions {
                if !options.contains(&direction.option_number) {
                    if let Some(prev) = previous.by_option(direction.option_number) {
                        *direction = prev.clone();
                    }
                }
            }
        }
        Self::finalize(brief, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brief::LockedCopy;
    use crate::direction::test_fixtures;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedDirector {
        calls: Arc<AtomicUsize>,
        responses: Mutex<Vec<Value>>,
    }

    impl ScriptedDirector {
        fn new(responses: Vec<Value>) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl TextModel for ScriptedDirector {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate_text(&self, _s: Option<&str>, _u: &str) -> anyhow::Result<String> {
            Ok(String::new())
        }

        async fn generate_json(
            &self,
            _s: Option<&str>,
            _u: &str,
            _schema: &Value,
        ) -> anyhow::Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                Ok(responses.remove(0))
            } else {
                Ok(responses[0].clone())
            }
        }
    }

    fn brief() -> Brief {
        Brief {
            brand_name: "NuRange".to_string(),
            keywords: vec!["predictive".into(), "signal".into(), "logistics".into()],
            ..Brief::default()
        }
    }

    fn coffee_brief() -> Brief {
        Brief {
            brand_name: "Hilltop Roastery".to_string(),
            product_description: "specialty coffee roastery".to_string(),
            keywords: vec!["coffee".into()],
            ..Brief::default()
        }
    }

    fn valid_value() -> Value {
        serde_json::to_value(test_fixtures::directions()).unwrap()
    }

    #[tokio::test]
    async fn valid_output_passes_through() {
        let model = Arc::new(ScriptedDirector::new(vec![valid_value()]));
        let director = Director::new(model.clone());
        let output = director
            .generate(&brief(), &ResearchSummary::default(), &[])
            .await
            .unwrap();
        assert_eq!(output.directions.len(), 4);
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_structure_consumes_repairs_then_fails() {
        let mut bad = test_fixtures::directions();
        bad.directions.truncate(3);
        let model = Arc::new(ScriptedDirector::new(vec![
            serde_json::to_value(&bad).unwrap(),
        ]));
        let director = Director::new(model.clone());
        let err = director
            .generate(&brief(), &ResearchSummary::default(), &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Director(DirectorError::OutputInvalid(_))
        ));
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn repair_recovers_from_first_bad_output() {
        let mut bad = test_fixtures::directions();
        bad.directions[0].colors[0].hex = "#12".to_string();
        let model = Arc::new(ScriptedDirector::new(vec![
            serde_json::to_value(&bad).unwrap(),
            valid_value(),
        ]));
        let director = Director::new(model.clone());
        let output = director
            .generate(&brief(), &ResearchSummary::default(), &[])
            .await
            .unwrap();
        assert!(output.validate().is_ok());
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cliche_in_logo_spec_is_rejected() {
        let mut cliched = test_fixtures::directions();
        cliched.directions[3].logo_spec.form =
            "a stylized coffee bean split down the middle".to_string();
        let model = Arc::new(ScriptedDirector::new(vec![
            serde_json::to_value(&cliched).unwrap(),
        ]));
        let director = Director::new(model);
        let err = director
            .generate(&coffee_brief(), &ResearchSummary::default(), &[])
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("coffee"), "{msg}");
    }

    #[tokio::test]
    async fn locked_copy_is_stamped_even_when_model_ignores_it() {
        let model = Arc::new(ScriptedDirector::new(vec![valid_value()]));
        let director = Director::new(model);
        let mut locked_brief = brief();
        locked_brief.locked_copy = Some(LockedCopy {
            tagline: Some("You'll always know before your customers do.".to_string()),
            slogan: Some("Know first. Act fast.".to_string()),
            announcement: Some("NuRange is live.".to_string()),
        });
        let output = director
            .generate(&locked_brief, &ResearchSummary::default(), &[])
            .await
            .unwrap();
        for direction in &output.directions {
            assert_eq!(direction.tagline, "You'll always know before your customers do.");
            assert_eq!(direction.ad_slogan, "Know first. Act fast.");
            assert_eq!(direction.announcement_copy, "NuRange is live.");
        }
    }

    #[tokio::test]
    async fn refine_carries_unselected_options_from_previous() {
        let previous = test_fixtures::directions();
        let mut refined = test_fixtures::directions();
        refined.directions[1].direction_name = "Playful Orbit".to_string();
        refined.directions[1].rationale = "Rebuilt around play, not polish.".to_string();
        // The model also (incorrectly) rewrote option 3; the carry-over
        // must restore it.
        refined.directions[2].direction_name = "Should Not Survive".to_string();

        let model = Arc::new(ScriptedDirector::new(vec![
            serde_json::to_value(&refined).unwrap(),
        ]));
        let director = Director::new(model);
        let output = director
            .refine(
                &brief(),
                &previous,
                "Make Option 2 less corporate, more playful",
                Some(&[2]),
                &ResearchSummary::default(),
                &[],
            )
            .await
            .unwrap();

        assert_eq!(output.by_option(2).unwrap().direction_name, "Playful Orbit");
        assert_eq!(
            output.by_option(3).unwrap().direction_name,
            previous.by_option(3).unwrap().direction_name
        );
        assert_eq!(
            output.by_option(1).unwrap(),
            previous.by_option(1).unwrap()
        );
    }

    #[test]
    fn constraints_only_appear_for_matched_industries() {
        assert!(concept_constraints(&coffee_brief())
            .unwrap()
            .contains("FORBIDDEN visuals"));
        assert!(concept_constraints(&Brief {
            brand_name: "Plainco".to_string(),
            ..Brief::default()
        })
        .is_none());
    }
}
