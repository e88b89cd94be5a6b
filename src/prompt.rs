//! Instruction text and output budget per mode

use log::debug;

use crate::config::MAX_COUNT;
use crate::request::RequestSpec;
use crate::{Mode, Tone};

// Output budget is linear in the requested count.
const WORD_BASE_BUDGET: u32 = 120;
const WORD_PER_ITEM_BUDGET: u32 = 24;
const SENTENCE_BASE_BUDGET: u32 = 200;
const SENTENCE_PER_ITEM_BUDGET: u32 = 80;

/// Size budget for `count` items in `mode`
pub fn size_budget(mode: Mode, count: usize) -> u32
{   let n = clamp_count(count) as u32;
    match mode
    {   Mode::Word => WORD_BASE_BUDGET + n * WORD_PER_ITEM_BUDGET
      , Mode::Sentence => SENTENCE_BASE_BUDGET + n * SENTENCE_PER_ITEM_BUDGET
    }
}

fn clamp_count(count: usize) -> usize
{   count.clamp(1, MAX_COUNT)
}

fn word_instruction(n: usize) -> String
{   format!(
      "你是一名中文写作助手。用户会给出一个中文词语，请给出恰好 {n} 个\
可以替换它的近义词或更贴切的说法，每个附一句简短的用法说明。\
只输出 JSON 对象，格式为 \
{{\"candidates\":[{{\"word\":\"替换词\",\"note\":\"用法说明\"}}]}}。\
不要使用代码块，不要输出任何其他文字。"
    )
}

fn sentence_instruction(n: usize, tone: Tone) -> String
{   let register = match tone
    {   Tone::Casual => "更口语、更简洁"
      , Tone::Formal => "更正式、更严谨"
    };
    format!(
      "你是一名中文写作助手。用户会给出一个中文句子，请用{register}的语气\
改写 {n} 次。保持原意不变，各个版本之间不要只是细微改动或简单重复。\
每个改写附一句简短说明。只输出 JSON 对象，格式为 \
{{\"candidates\":[{{\"word\":\"改写后的句子\",\"note\":\"说明\"}}]}}。\
不要使用代码块，不要输出任何其他文字。"
    )
}

/// Build the provider-agnostic request for one query
pub fn build_request_spec(
  text: &str
, mode: Mode
, tone: Tone
, count: usize
, temperature: f64
) -> RequestSpec
{   let n = clamp_count(count);
    let (system_prompt, user_prompt) = match mode
    {   Mode::Word => (
          word_instruction(n)
        , format!("词语：{}", text.trim())
        )
      , Mode::Sentence => (
          sentence_instruction(n, tone)
        , format!("句子：{}", text.trim())
        )
    };
    let max_output_size = size_budget(mode, n);
    debug!(
      "Built {:?} prompt for {} items, budget {}",
      mode, n, max_output_size
    );
    RequestSpec
    {   system_prompt
      , user_prompt
      , max_output_size
      , temperature
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn budget_scales_linearly_with_count()
    {   let step = size_budget(Mode::Word, 6) - size_budget(Mode::Word, 5);
        assert_eq!(step, WORD_PER_ITEM_BUDGET);
        assert_eq!(size_budget(Mode::Word, 5), 120 + 5 * 24);
        assert!(
          size_budget(Mode::Sentence, 3) > size_budget(Mode::Word, 3)
        );
    }

    #[test]
    fn word_prompt_asks_for_exact_count_and_json()
    {   let spec = build_request_spec(
          "  宏伟 ", Mode::Word, Tone::Casual, 8, 0.3
        );
        assert!(spec.system_prompt.contains("恰好 8 个"));
        assert!(spec.system_prompt.contains("\"candidates\""));
        assert!(spec.system_prompt.contains("不要使用代码块"));
        assert_eq!(spec.user_prompt, "词语：宏伟");
        assert_eq!(spec.temperature, 0.3);
    }

    #[test]
    fn sentence_prompt_follows_tone()
    {   let casual = build_request_spec(
          "我们明天开会", Mode::Sentence, Tone::Casual, 3, 0.7
        );
        let formal = build_request_spec(
          "我们明天开会", Mode::Sentence, Tone::Formal, 3, 0.7
        );
        assert!(casual.system_prompt.contains("口语"));
        assert!(formal.system_prompt.contains("正式"));
        assert_ne!(casual.system_prompt, formal.system_prompt);
        assert_eq!(casual.max_output_size, 200 + 3 * 80);
    }

    #[test]
    fn count_is_clamped_to_schema_bounds()
    {   let spec = build_request_spec("好", Mode::Word, Tone::Casual, 40, 0.5);
        assert!(spec.system_prompt.contains("恰好 12 个"));
        assert_eq!(spec.max_output_size, size_budget(Mode::Word, 12));
    }
}
