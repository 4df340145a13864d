//! Mock policy — deterministic canned replies used when no model is loaded.
//!
//! The policy is an ordered table of keyword rows. The last message is
//! lower-cased and the first row with a keyword contained in it wins;
//! otherwise the fallback template echoes the message back.

/// One row of the policy: any keyword match selects `response`.
#[derive(Debug, Clone, Copy)]
pub struct MockRule {
    pub keywords: &'static [&'static str],
    pub response: &'static str,
}

/// Rows in priority order.
pub const MOCK_RULES: &[MockRule] = &[
    MockRule {
        keywords: &["terrier", "terriers"],
        response: "Based on the provided context, there are several terrier breeds available in the system. \
                   Terriers are a group of dog breeds that were originally bred for hunting vermin. \
                   Some common terrier breeds include Yorkshire Terrier, Bull Terrier, and Scottish Terrier.",
    },
    MockRule {
        keywords: &["bulldog", "bulldogs"],
        response: "Based on the context, bulldogs are a breed of dog known for their distinctive appearance. \
                   The system contains information about different bulldog varieties.",
    },
    MockRule {
        keywords: &["shepherd", "shepherds"],
        response: "Based on the context, shepherd breeds are working dogs originally bred for herding livestock. \
                   The system includes information about various shepherd breeds and their sub-breeds.",
    },
    MockRule {
        keywords: &["hound", "hounds"],
        response: "Based on the provided information, hounds are a group of hunting dogs. \
                   The system contains data about different hound breeds.",
    },
];

/// Reply used when no rule matches. The question is quoted verbatim.
pub fn fallback_response(question: &str) -> String {
    format!(
        "Based on the available dog breed information, I can help answer questions about various breeds. \
         However, I need more specific context to provide a detailed answer to your question: '{question}'. \
         Please try asking about specific breeds or characteristics."
    )
}

/// Pick the canned reply for the most recent message content.
pub fn respond(last_message: &str) -> String {
    let lowered = last_message.to_lowercase();
    MOCK_RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| lowered.contains(k)))
        .map(|rule| rule.response.to_string())
        .unwrap_or_else(|| fallback_response(last_message))
}
