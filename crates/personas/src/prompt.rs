//! Prompt construction.
//!
//! Substitution is literal string replacement over a fixed placeholder
//! vocabulary: `{{name}}`, `{{role}}`, `{{traits}}`,
//! `{{communication_style}}`, `{{expertise}}`, `{{concerns}}`. Every
//! occurrence of a placeholder is replaced.

use stakeholder_core::consultation::ConsultationContext;
use stakeholder_core::persona::Persona;

fn bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the persona's template (or the default one).
pub fn build_system_prompt(persona: &Persona) -> String {
    let substitutions = [
        ("{{name}}", persona.name.clone()),
        ("{{role}}", persona.role.clone()),
        ("{{traits}}", persona.personality.traits.join(", ")),
        (
            "{{communication_style}}",
            persona.personality.communication_style.clone(),
        ),
        ("{{expertise}}", bullets(&persona.expertise)),
        ("{{concerns}}", bullets(&persona.concerns)),
    ];

    substitutions
        .iter()
        .fold(persona.template().to_string(), |acc, (placeholder, value)| {
            acc.replace(placeholder, value)
        })
}

/// Render situational context as markdown sections.
///
/// Sections appear in a fixed order (project, previous feedback,
/// artifacts) and are omitted when their source is empty. Returns an
/// empty string when there is nothing to say.
pub fn build_context_string(context: Option<&ConsultationContext>) -> String {
    let Some(context) = context else {
        return String::new();
    };

    let mut sections = Vec::new();

    if let Some(description) = context
        .project_description
        .as_deref()
        .filter(|d| !d.is_empty())
    {
        sections.push(format!("## Project Context\n{description}"));
    }

    if !context.previous_feedback.is_empty() {
        let feedback = context
            .previous_feedback
            .iter()
            .map(|f| format!("- {}: {}", f.persona_id, f.summary))
            .collect::<Vec<_>>()
            .join("\n");
        sections.push(format!("## Previous Stakeholder Feedback\n{feedback}"));
    }

    if !context.artifacts.is_empty() {
        let artifacts = context
            .artifacts
            .iter()
            .map(|a| {
                let language = a
                    .language
                    .as_deref()
                    .map(|l| format!(" ({l})"))
                    .unwrap_or_default();
                format!("### {}{language}\n```\n{}\n```", a.kind, a.content)
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        sections.push(format!("## Artifacts for Review\n{artifacts}"));
    }

    sections.join("\n\n")
}

/// The caller's prompt followed by the rendered context, if any.
pub fn build_user_prompt(prompt: &str, context: Option<&ConsultationContext>) -> String {
    let rendered = build_context_string(context);
    if rendered.is_empty() {
        prompt.to_string()
    } else {
        format!("{prompt}\n\n{rendered}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stakeholder_core::consultation::{Artifact, ArtifactKind, FeedbackSummary};
    use stakeholder_core::persona::{Personality, Provenance};

    fn persona(template: Option<&str>) -> Persona {
        let now = Utc::now();
        Persona {
            id: "cfo".into(),
            name: "Dana".into(),
            role: "Chief Financial Officer".into(),
            model: None,
            personality: Personality {
                traits: vec!["skeptical".into(), "precise".into()],
                communication_style: "Short and direct".into(),
            },
            expertise: vec!["budgeting".into(), "forecasting".into()],
            concerns: vec!["cost".into()],
            prompt_template: template.map(String::from),
            source: Provenance::Config,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn default_template_renders_every_placeholder() {
        let prompt = build_system_prompt(&persona(None));
        assert!(prompt.starts_with("You are Dana, a Chief Financial Officer."));
        assert!(prompt.contains("Your personality traits: skeptical, precise."));
        assert!(prompt.contains("Your communication style: Short and direct."));
        assert!(prompt.contains("- budgeting\n- forecasting"));
        assert!(prompt.contains("you prioritize:\n- cost"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn repeated_placeholders_all_substitute() {
        let prompt = build_system_prompt(&persona(Some("{{name}} / {{name}} ({{role}})")));
        assert_eq!(prompt, "Dana / Dana (Chief Financial Officer)");
    }

    #[test]
    fn unknown_placeholders_are_left_alone() {
        let prompt = build_system_prompt(&persona(Some("{{name}} {{mood}}")));
        assert_eq!(prompt, "Dana {{mood}}");
    }

    #[test]
    fn empty_context_renders_nothing() {
        assert_eq!(build_context_string(None), "");
        assert_eq!(build_context_string(Some(&ConsultationContext::default())), "");

        let session_only = ConsultationContext {
            session_id: Some("s1".into()),
            ..ConsultationContext::default()
        };
        assert_eq!(build_context_string(Some(&session_only)), "");
    }

    #[test]
    fn context_sections_in_fixed_order() {
        let ctx = ConsultationContext {
            session_id: None,
            project_description: Some("Billing rewrite".into()),
            previous_feedback: vec![FeedbackSummary {
                persona_id: "cto".into(),
                summary: "Ship it".into(),
            }],
            artifacts: vec![
                Artifact {
                    kind: ArtifactKind::Code,
                    content: "fn bill() {}".into(),
                    language: Some("rust".into()),
                },
                Artifact {
                    kind: ArtifactKind::Design,
                    content: "Flow diagram".into(),
                    language: None,
                },
            ],
        };

        let rendered = build_context_string(Some(&ctx));
        assert_eq!(
            rendered,
            "## Project Context\nBilling rewrite\n\n\
             ## Previous Stakeholder Feedback\n- cto: Ship it\n\n\
             ## Artifacts for Review\n### code (rust)\n```\nfn bill() {}\n```\n\n\
             ### design\n```\nFlow diagram\n```"
        );
    }

    #[test]
    fn context_is_appended_after_prompt() {
        let ctx = ConsultationContext {
            project_description: Some("Billing".into()),
            ..ConsultationContext::default()
        };
        assert_eq!(
            build_user_prompt("Thoughts?", Some(&ctx)),
            "Thoughts?\n\n## Project Context\nBilling"
        );
        assert_eq!(build_user_prompt("Thoughts?", None), "Thoughts?");
    }
}
