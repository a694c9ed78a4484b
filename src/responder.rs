//! Canned replies for the text endpoint, picked by keyword.

use chrono::NaiveTime;

/// Reply to `text`. The first matching keyword wins; `now` fills the time reply.
pub fn respond(text: &str, now: NaiveTime) -> String {
    let text = text.to_lowercase();

    if text.contains("hello") || has_word(&text, "hi") {
        "Hello there! How can I help you today?".to_string()
    } else if text.contains("how are you") {
        "I'm just a program, but I'm functioning well. Thanks for asking!".to_string()
    } else if text.contains("bye") {
        "Goodbye! Feel free to come back if you have more questions.".to_string()
    } else if text.contains("help") {
        "I can process your text and audio messages. Try recording an audio message or asking me a question!".to_string()
    } else if text.contains("time") {
        format!("The current server time is {}", now.format("%H:%M:%S"))
    } else if text.contains("thank") {
        "You're welcome!".to_string()
    } else {
        format!("I received your message: '{text}'. How can I assist you further?")
    }
}

fn has_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric())
        .any(|w| w == word)
}
