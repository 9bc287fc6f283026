//! Agent Card：`/.well-known/agent.json` 返回的能力描述

use serde_json::{json, Value};

pub const AGENT_NAME: &str = "Conversational Memory Agent";
pub const AGENT_VERSION: &str = "1.0.0";

/// 生成 Agent Card，url 相关字段使用对外可见的 base_url
pub fn agent_card(base_url: &str) -> Value {
    json!({
        "name": AGENT_NAME,
        "description": "An agent that can remember and recall information using a database and understand user intent with the AI.",
        "url": base_url,
        "provider": {
            "organization": "Telex Org.",
            "url": base_url
        },
        "version": AGENT_VERSION,
        "documentationUrl": format!("{}/docs", base_url),
        "is_paid": false,
        "price": {},
        "capabilities": {
            "streaming": false,
            "pushNotifications": true
        },
        "defaultInputModes": ["text/plain"],
        "defaultOutputModes": ["text/plain"],
        "skills": [
            {
                "id": "convo",
                "name": "Conversation",
                "description": "Responds to user input with meaningful related output.",
                "inputModes": ["text"],
                "outputModes": ["text"],
                "examples": [
                    {
                        "input": {"parts": [{"text": "Hello", "contentType": "text/plain"}]},
                        "output": {"parts": [{"text": "Hi, how are you?", "contentType": "text/plain"}]}
                    }
                ]
            },
            {
                "id": "storage",
                "name": "Information storage",
                "description": "Stores important information or facts sent by the user",
                "inputModes": ["text"],
                "outputModes": ["text"],
                "examples": [
                    {
                        "input": {"parts": [{"text": "Hello, my name is Idara. My favorite color is blue", "contentType": "text/plain"}]},
                        "output": {"parts": [{"text": "Hi, Idara, nice to meet you", "contentType": "text/plain"}]}
                    },
                    {
                        "input": {"parts": [{"text": "What is my favorite color?", "contentType": "text/plain"}]},
                        "output": {"parts": [{"text": "Your favorite color is blue.", "contentType": "text/plain"}]}
                    }
                ]
            }
        ]
    })
}
