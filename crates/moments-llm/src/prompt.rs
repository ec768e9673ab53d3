use crate::protocol::{ChatMessage, RequestPart};

pub const SYSTEM_PROMPT: &str = "你是一个追求异性的高手，对于青春男女生的心理和外在表现，有非常强的洞察，也有一套很厉害的追求异性的技巧！擅长于输出简短但有效的分析和建议。";

/// Instruction appended after the image parts. Describes the JSON layout the
/// normalizer and report renderer expect.
pub const ANALYSIS_PROMPT: &str = r#"请你综合分析这些朋友圈截图里的内容，先用一段 400-800 字的中文长文，口语化地描述对方的性格、兴趣、生活方式、价值观和情绪，然后再按下面给出的 JSON 结构，输出一个字段齐全的 JSON。最终回复必须是一个合法 JSON，对象结构如下：
{
  "raw_text": "口语化长文分析，400-800 字",
  "structured": {
    "personality": {
      "tags": ["标签1", "标签2"],
      "description": "性格描述"
    },
    "interests": [
      {"name": "兴趣名称", "level": "程度", "description": "描述描述"}
    ],
    "lifestyle": {
      "habits": ["习惯1", "习惯2"],
      "description": "生活方式描述"
    },
    "values": {
      "career": "事业观",
      "relationship": "感情观",
      "family": "家庭观",
      "life": "人生观"
    },
    "emotion": {
      "state": "情绪状态",
      "description": "情绪描述"
    },
    "suggestions": {
      "topics": ["话题1", "话题2"],
      "openings": ["开场白1", "开场白2"],
      "dating": {
        "places": ["地点1", "地点2"],
        "activities": ["活动1", "活动2"]
      },
      "warnings": ["注意事项1", "注意事项2"],
      "strategy": ["阶段1建议", "阶段2建议"]
    }
  }
}
只返回 JSON 本身，不要额外加解释文字、前后缀。"#;

/// System message followed by one user message: every image as an
/// `image_url` part, then the fixed instruction.
pub fn build_analysis_messages(images: &[String]) -> Vec<ChatMessage> {
    let mut parts: Vec<RequestPart> = images.iter().cloned().map(RequestPart::image).collect();
    parts.push(RequestPart::text(ANALYSIS_PROMPT));

    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user_parts(parts),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{RequestContent, Role};

    #[test]
    fn images_precede_instruction() {
        let images = vec!["data:image/jpeg;base64,A".to_string(), "data:image/jpeg;base64,B".to_string()];

        let messages = build_analysis_messages(&images);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        let RequestContent::Parts(parts) = &messages[1].content else {
            panic!("user message should carry parts");
        };
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], RequestPart::image("data:image/jpeg;base64,A"));
        assert_eq!(parts[1], RequestPart::image("data:image/jpeg;base64,B"));
        assert_eq!(parts[2], RequestPart::text(ANALYSIS_PROMPT));
    }

    #[test]
    fn instruction_names_every_section() {
        for section in ["personality", "interests", "lifestyle", "values", "emotion", "suggestions"] {
            assert!(ANALYSIS_PROMPT.contains(section), "missing {}", section);
        }
    }
}
