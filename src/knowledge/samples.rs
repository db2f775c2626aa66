//! Built-in sample knowledge base.

use super::KnowledgeEntry;

const SAMPLES: &[(&str, &str)] = &[
    (
        "Hello, how are you?",
        "I am doing well, thank you for asking! How can I help you today?",
    ),
    (
        "What is your name?",
        "I am an offline voice assistant chatbot designed to help answer your questions.",
    ),
    (
        "How can I use this chatbot?",
        "You can either click the microphone button to speak your question or type it in the text box. I will respond with both text and voice.",
    ),
    (
        "Tell me a joke",
        "Why don't scientists trust atoms? Because they make up everything!",
    ),
    (
        "What is artificial intelligence?",
        "Artificial Intelligence (AI) is the simulation of human intelligence processes by machines, especially computer systems. These processes include learning, reasoning, and self-correction.",
    ),
    (
        "Can you help me?",
        "Of course! I am here to help. Please ask me any questions you have.",
    ),
];

/// The deterministic fallback entries used when no CSV is available.
pub fn sample_entries() -> Vec<KnowledgeEntry> {
    SAMPLES
        .iter()
        .map(|(q, a)| KnowledgeEntry::new(*q, *a))
        .collect()
}
