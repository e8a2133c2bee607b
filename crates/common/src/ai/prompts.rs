//! System prompts for the generation pipeline
//!
//! Structured-output prompts document the exact JSON shape inline and ask
//! for nothing but the object; the reply still passes through the tolerant
//! extraction boundary before anything downstream sees it.

use super::ContentType;

/// Instruction for the vision extraction step
pub fn extraction_prompt() -> &'static str {
    "You are a text extraction engine. Return the raw text contained in the \
     supplied document exactly as written. Output the extracted text only, \
     with no commentary, headers, or formatting of your own."
}

/// Pedagogical prompt for the solution step of the analyze flow
pub fn solution_prompt(subject: Option<&str>, language: &str) -> String {
    let focus = match subject {
        Some(subject) => format!(" The material concerns {}.", subject),
        None => String::new(),
    };
    format!(
        "You are a patient tutor.{} Walk through the problem step by step, \
         explaining the reasoning behind each step rather than only stating \
         the answer. Structure the response with headings and lists where \
         it helps. Respond in {}.",
        focus, language
    )
}

/// System prompt for the study chat endpoint
pub fn chat_prompt(subject: Option<&str>, language: &str) -> String {
    let focus = match subject {
        Some(subject) => format!(" The learner is currently studying {}.", subject),
        None => String::new(),
    };
    format!(
        "You are a friendly study assistant for a learning app.{} Explain \
         concepts clearly, prefer short worked examples, and encourage the \
         learner to reason along. Respond in {}.",
        focus, language
    )
}

/// Structured-output prompt for one of the four artifact kinds
pub fn artifact_prompt(
    content_type: ContentType,
    count: usize,
    subject: Option<&str>,
    language: &str,
) -> String {
    let focus = match subject {
        Some(subject) => format!(" The source material concerns {}.", subject),
        None => String::new(),
    };

    let shape = match content_type {
        ContentType::Flashcards => format!(
            "Produce exactly {count} flashcards covering the most important \
             facts. Respond with ONLY a JSON object of this exact shape:\n\
             {{\"flashcards\": [{{\"front\": \"question or term\", \"back\": \
             \"answer or definition\"}}]}}"
        ),
        ContentType::Quiz => format!(
            "Produce exactly {count} multiple-choice questions. Every \
             question has exactly 4 options and correct_index identifies \
             the right one (0-3). Respond with ONLY a JSON object of this \
             exact shape:\n{{\"questions\": [{{\"question\": \"...\", \
             \"options\": [\"a\", \"b\", \"c\", \"d\"], \"correct_index\": 0}}]}}"
        ),
        ContentType::Synthesis =>
            "Produce a structured revision summary of the material. Respond \
             with ONLY a JSON object of this exact shape:\n{\"title\": \
             \"...\", \"content\": \"markdown summary with headings\", \
             \"tags\": [\"...\"]}"
                .to_string(),
        ContentType::Comic => format!(
            "Write an educational comic script of exactly {count} panels \
             that teaches the material. Respond with ONLY a JSON object of \
             this exact shape:\n{{\"title\": \"...\", \"panels\": \
             [{{\"id\": 1, \"content\": \"visual description of the panel\", \
             \"hasDialog\": true, \"dialog\": \"spoken line\"}}]}}"
        ),
    };

    format!(
        "You create study content for a learning app.{focus} {shape}\n\
         Write all content in {language}. Do not wrap the object in markdown \
         fences or add any text before or after it."
    )
}

/// Structured-output prompt for the exam study planner
pub fn study_plan_prompt(language: &str) -> String {
    format!(
        "You are an exam preparation planner. Given an exam, its date, the \
         topic checklist, and the learner's availability, lay out study \
         sessions between today and the exam. Prioritize uncovered topics \
         and spread the load evenly. Respond with ONLY a JSON object of \
         this exact shape:\n{{\"sessions\": [{{\"date\": \"YYYY-MM-DD\", \
         \"startTime\": \"HH:MM\", \"endTime\": \"HH:MM\", \"subject\": \
         \"...\", \"topic\": \"...\", \"description\": \"what to do\"}}], \
         \"advice\": \"one short paragraph of overall guidance\"}}\n\
         Times use the 24-hour clock. Write all content in {language}. Do \
         not wrap the object in markdown fences or add any text around it."
    )
}

/// Prompt for a comic panel illustration
pub fn comic_image_prompt(panel_description: &str, subject: &str, style: Option<&str>) -> String {
    let style = style.unwrap_or("colorful cartoon, clean lines, friendly characters");
    format!(
        "Educational comic panel about {subject}: {panel_description}. \
         Style: {style}. No text or speech bubbles in the image."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_prompts_pin_the_shape() {
        let prompt = artifact_prompt(ContentType::Quiz, 3, Some("Biology"), "en");
        assert!(prompt.contains("exactly 3"));
        assert!(prompt.contains("correct_index"));
        assert!(prompt.contains("Biology"));

        let prompt = artifact_prompt(ContentType::Comic, 6, None, "fr");
        assert!(prompt.contains("hasDialog"));
        assert!(prompt.contains("fr"));
    }

    #[test]
    fn test_solution_prompt_mentions_reasoning() {
        let prompt = solution_prompt(Some("Math"), "en");
        assert!(prompt.contains("step by step"));
        assert!(prompt.contains("Math"));
    }

    #[test]
    fn test_study_plan_prompt_shape() {
        let prompt = study_plan_prompt("en");
        assert!(prompt.contains("startTime"));
        assert!(prompt.contains("YYYY-MM-DD"));
    }
}
