use crate::constants::*;

/// A message must carry text, an image, or both. A lone whitespace
/// placeholder is accepted when an image URL is present (image-only sends
/// store `" "` as content).
pub fn validate_message_body(content: &str, image_url: Option<&str>) -> Result<(), String> {
    let has_image = image_url.map(|u| !u.trim().is_empty()).unwrap_or(false);
    if content.trim().is_empty() && !has_image {
        return Err("Message content or image is required".into());
    }
    if content.len() > MAX_MESSAGE_LENGTH {
        return Err(format!(
            "Message must be at most {} characters",
            MAX_MESSAGE_LENGTH
        ));
    }
    Ok(())
}

pub fn validate_emoji(emoji: &str) -> Result<(), String> {
    if emoji.trim().is_empty() {
        return Err("Emoji is required".into());
    }
    if emoji.len() > MAX_EMOJI_LENGTH {
        return Err("Emoji too long".into());
    }
    Ok(())
}

pub fn validate_chat_id(chat_id: &str) -> Result<(), String> {
    if chat_id.trim().is_empty() {
        return Err("chatId is required".into());
    }
    Ok(())
}
