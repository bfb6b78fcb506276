//! Shared fixtures for unit tests.
use serde_json::{Value, json};

use crate::config::GameConfig;

pub(crate) fn sample_json() -> Value {
    json!({
        "game_info": {
            "title": "Test Game",
            "description": "Test game description",
            "version": "1.0.0",
            "author": "Test Author"
        },
        "theme": {
            "name": "Test Theme",
            "card_back": "card_back.png",
            "color_scheme": {"primary": "#000000", "secondary": "#ffffff", "accent": "#ff0000"},
            "resource_icons": {"resource1": "resource1.png", "resource2": "resource2.png"},
            "filters": {"default": ["none"], "available": ["grayscale"]}
        },
        "game_settings": {
            "initial_resources": {"resource1": 50, "resource2": 50},
            "win_conditions": [{"resource": "resource1", "min": 10, "max": 90}],
            "difficulty_modifiers": {"easy": 0.7, "standard": 1.0, "hard": 1.3},
            "turn_unit": "years",
            "stats": {"popularity_formula": "resource1*0.5 + resource2*0.5"}
        },
        "cards": [
            {
                "id": "card_001",
                "title": "Test Card",
                "text": "Test card text",
                "image": "card.png",
                "choices": {
                    "left": {"text": "Left choice", "effects": {"resource1": 10}, "next_card": "card_002"},
                    "right": {"text": "Right choice", "effects": {"resource2": -5}}
                }
            },
            {
                "id": "card_002",
                "title": "Test Card 2",
                "text": "Test card text 2",
                "image": "card2.png",
                "choices": {
                    "left": {"text": "Left choice", "effects": {"resource1": -5}, "next_card": "card_001"},
                    "right": {"text": "Right choice", "effects": {"resource2": 10}}
                }
            }
        ]
    })
}

pub(crate) fn sample_config() -> GameConfig {
    match GameConfig::from_value(sample_json()) {
        Ok(config) => config,
        Err(err) => panic!("sample scenario should validate: {err}"),
    }
}
