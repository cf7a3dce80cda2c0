//! Model pricing registry.
//!
//! Costs are in nanodollars (1e-9 USD) per token.

use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy)]
pub struct ModelPricing {
    pub input_nanos_per_token: i64,
    pub output_nanos_per_token: i64,
}

impl ModelPricing {
    const fn new(input: i64, output: i64) -> Self {
        Self {
            input_nanos_per_token: input,
            output_nanos_per_token: output,
        }
    }

    pub fn calculate_cost(&self, input_tokens: u32, output_tokens: u32) -> i64 {
        (input_tokens as i64) * self.input_nanos_per_token
            + (output_tokens as i64) * self.output_nanos_per_token
    }
}

// DeepSeek list prices, cache-miss input:
// deepseek-chat: $0.27/1M input, $1.10/1M output
// deepseek-reasoner: $0.55/1M input, $2.19/1M output

const DEEPSEEK_CHAT: ModelPricing = ModelPricing::new(270, 1_100);
const DEEPSEEK_REASONER: ModelPricing = ModelPricing::new(550, 2_190);

/// Used for models missing from the registry.
const FALLBACK: ModelPricing = ModelPricing::new(1_000, 5_000);

static PRICING_MAP: OnceLock<HashMap<&'static str, ModelPricing>> = OnceLock::new();

fn init_pricing() -> HashMap<&'static str, ModelPricing> {
    let mut map = HashMap::new();
    map.insert("deepseek-chat", DEEPSEEK_CHAT);
    map.insert("deepseek-reasoner", DEEPSEEK_REASONER);
    map
}

pub fn get_pricing(model_id: &str) -> Option<ModelPricing> {
    PRICING_MAP.get_or_init(init_pricing).get(model_id).copied()
}

pub fn chat_cost(model: &str, input_tokens: u32, output_tokens: u32) -> i64 {
    get_pricing(model)
        .unwrap_or(FALLBACK)
        .calculate_cost(input_tokens, output_tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_cost() {
        // 1K input * 270 + 1K output * 1100 = 1,370,000 nanos
        assert_eq!(chat_cost("deepseek-chat", 1_000, 1_000), 1_370_000);
        assert_eq!(chat_cost("deepseek-reasoner", 1_000, 0), 550_000);
    }

    #[test]
    fn unknown_model_uses_fallback() {
        assert_eq!(chat_cost("mystery", 1, 1), 6_000);
        assert!(get_pricing("mystery").is_none());
    }
}
