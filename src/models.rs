//! Model identifiers accepted by the Groq API.

// LLaMA
pub const LLAMA_3_3_70B_VERSATILE: &str = "llama-3.3-70b-versatile";
pub const LLAMA_3_3_70B_CHAT: &str = "llama-3.3-70b-chat";

// Mixtral
pub const MIXTRAL_8X7B_VERSATILE: &str = "mixtral-8x7b-versatile";
pub const MIXTRAL_8X7B_CHAT: &str = "mixtral-8x7b-chat";

// Gemma
pub const GEMMA_7B_VERSATILE: &str = "gemma-7b-versatile";
pub const GEMMA_7B_CHAT: &str = "gemma-7b-chat";

// DeepSeek R1 distillations
pub const DEEPSEEK_R1_DISTILL_LLAMA_70B: &str = "deepseek-r1-distill-llama-70b";
pub const DEEPSEEK_R1_DISTILL_QWEN_32B: &str = "deepseek-r1-distill-qwen-32b";

pub const ALL_MODELS: [&str; 8] = [
    LLAMA_3_3_70B_VERSATILE,
    LLAMA_3_3_70B_CHAT,
    MIXTRAL_8X7B_VERSATILE,
    MIXTRAL_8X7B_CHAT,
    GEMMA_7B_VERSATILE,
    GEMMA_7B_CHAT,
    DEEPSEEK_R1_DISTILL_LLAMA_70B,
    DEEPSEEK_R1_DISTILL_QWEN_32B,
];
