// src/llm/prompts.rs
//! System prompt assembly for the response generator.
//!
//! The prompt is built fresh for every exchange from the classification
//! verdict, the session identity, retrieved knowledge, and any pending
//! escalation. Section order matters: identity first, safety guidance
//! before task guidance, style rules last.

use crate::escalation::ContactRecord;
use crate::session::{Session, UserType};

use super::intent::{EmotionalState, Intent, IntentDescriptor};

/// Persona and ground rules shared by every generated reply.
pub const BASE_PROMPT: &str = "\
You are Juno, Northfield University's virtual assistant for remote and distance students. \
You help students in degree completion programs who study off campus and rarely visit in person.

Your responsibilities:
- Answer questions about fees, courses, registration, and university policies
- Support students who feel isolated or stressed by remote study
- Connect students with the right human contact when a situation needs one
- Help prospective students understand the degree completion programs

Ground rules:
- Never invent policies, fees, amounts, or deadlines. If you are not sure, say so and point to the right office.
- Never provide medical, legal, or financial advice beyond published university information.
- You are not a counsellor. For emotional distress, acknowledge it and route to the Student Wellbeing Centre.";

/// Everything the prompt builder needs for one exchange.
pub struct PromptContext<'a> {
    pub descriptor: &'a IntentDescriptor,
    pub session: &'a Session,
    /// Formatted retrieval block, or an explicit no-results marker.
    pub knowledge_context: Option<&'a str>,
    pub escalation: Option<&'a ContactRecord>,
}

pub fn build_system_prompt(ctx: &PromptContext<'_>) -> String {
    let mut prompt = String::from(BASE_PROMPT);
    let session = ctx.session;
    let descriptor = ctx.descriptor;

    if !session.name.trim().is_empty() {
        prompt.push_str(&format!("\n\nCurrent Student: {}", session.name));
        if let Some(level) = session.student_info.level {
            prompt.push_str(&format!(
                "\nStudent Info: Level {}, {}, {} courses",
                level, session.student_info.semester, session.student_info.course_count
            ));
        }
    }

    if session.user_type == UserType::Prospective {
        prompt.push_str(
            "\n\nNote: This is a PROSPECTIVE student, not an enrolled one. Do not discuss \
             account-specific details. For admission requirements, deadlines, or program fit, \
             direct them to the Admissions office.",
        );
    }

    match descriptor.emotional_state {
        EmotionalState::Crisis => prompt.push_str(
            "\n\n🚨 CRITICAL: The student may be in crisis. Respond with warmth and without \
             judgment. Immediately provide these resources:\n\
             - Student Wellbeing Centre Crisis Support: 416-555-0144 ext. 2700\n\
             - 24/7 Crisis Line: 1-833-555-0199\n\
             - CalmLine (post-secondary student helpline): 1-877-555-0132\n\
             Encourage them to reach out to a human right now. Keep your reply short and \
             focused on getting them connected.",
        ),
        EmotionalState::Stressed => prompt.push_str(
            "\n\n⚠️ The student sounds stressed. Acknowledge the pressure before anything \
             else, keep the answer manageable, and mention that the Student Wellbeing Centre \
             offers free counselling for remote students (8am-10pm daily).",
        ),
        EmotionalState::Frustrated => prompt.push_str(
            "\n\nThe student sounds frustrated. Acknowledge the frustration, avoid defending \
             process, and focus on the concrete next step that resolves their problem.",
        ),
        _ => {}
    }

    match descriptor.intent {
        Intent::FeeInquiry => prompt.push_str(
            "\n\nThis is a fee question. Be precise about which fees apply to remote \
             students and mention the supplementary fee exemption process when relevant. \
             Never quote an amount that is not in the provided information.",
        ),
        Intent::EmotionalSupport => prompt.push_str(
            "\n\nThe student needs support more than information. Listen first, validate, \
             and offer the Wellbeing Centre as a next step rather than a brush-off.",
        ),
        Intent::ProspectiveStudent => prompt.push_str(
            "\n\nThis is an admissions question. Describe the degree completion programs at \
             a high level and route specifics to the Admissions office.",
        ),
        Intent::CourseQuestion => prompt.push_str(
            "\n\nThis is a course or registration question. Give the procedural answer and \
             name the deadline or office involved when the provided information includes one.",
        ),
        _ => {}
    }

    if let Some(context) = ctx.knowledge_context {
        if !context.trim().is_empty() {
            prompt.push_str(&format!(
                "\n\nRelevant Information from the Northfield Knowledge Base:\n{}\n\n\
                 Use this information to answer. Cite the source name when you rely on it.",
                context
            ));
        }
    }

    if let Some(contact) = ctx.escalation {
        prompt.push_str(&format!(
            "\n\nEscalation Required: After addressing the student's concern, let them know \
             you are connecting them with {}.\nContact information to provide:\n- Email: {}",
            contact.department, contact.email
        ));
        if let Some(phone) = &contact.phone {
            prompt.push_str(&format!("\n- Phone: {}", phone));
        }
        prompt.push_str(&format!(
            "\n- Office Hours: {}\n- Expected Response: {}",
            contact.office_hours, contact.response_time
        ));
    }

    if let Some(previous) = &session.previous_context {
        if !previous.trim().is_empty() {
            prompt.push_str(&format!(
                "\n\nSummary of this student's previous conversation: {}\n\
                 Continue naturally from it. Do not ask for information the summary already \
                 answers.",
                previous
            ));
        }
    }

    prompt.push_str(
        "\n\nResponse style: warm and plain-spoken, two to four short paragraphs at most. \
         Be specific about next steps. Do not repeat the student's question back to them.",
    );

    prompt
}
