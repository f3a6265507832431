//! Registry of AI actions
//!
//! Every action the dispatcher accepts is declared here with its module,
//! plan gating, system prompt and the JSON schema the model must fill in
//! through a forced tool call. The registry is static; unknown action ids
//! are rejected before any I/O.

use lucid_common::models::Module;
use serde::Serialize;
use serde_json::{json, Value};

/// One schema-constrained LLM invocation
#[derive(Debug)]
pub struct ActionSpec {
    /// Registry key, also used as the tool function name
    pub id: &'static str,
    pub module: Module,
    pub is_pro: bool,
    pub description: &'static str,
    pub system_prompt: &'static str,
    output_schema: fn() -> Value,
}

impl ActionSpec {
    /// JSON schema for the tool parameters
    pub fn output_schema(&self) -> Value {
        (self.output_schema)()
    }

    /// Top-level fields the model must return
    pub fn required_fields(&self) -> Vec<String> {
        self.output_schema()["required"]
            .as_array()
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(|f| f.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Public view of an action for `GET /ai-assist/actions`
#[derive(Debug, Clone, Serialize)]
pub struct ActionInfo {
    pub id: &'static str,
    pub module: Module,
    pub is_pro: bool,
    pub description: &'static str,
}

impl From<&ActionSpec> for ActionInfo {
    fn from(spec: &ActionSpec) -> Self {
        Self {
            id: spec.id,
            module: spec.module,
            is_pro: spec.is_pro,
            description: spec.description,
        }
    }
}

const COMMON_RULES: &str = "Tu réponds en français, avec sobriété. Tu n'émets aucun diagnostic \
médical ou psychologique et tu ne donnes pas de conseil prescriptif. Tu t'appuies uniquement sur \
le contexte fourni. Tu réponds exclusivement via l'outil demandé.";

static ACTIONS: &[ActionSpec] = &[
    ActionSpec {
        id: "clarify_threshold",
        module: Module::Irreversa,
        is_pro: false,
        description: "Clarify what makes a decision or event irreversible",
        system_prompt: "Tu accompagnes une réflexion IRREVERSA sur les seuils irréversibles. \
À partir du dossier et de la saisie, reformule le seuil en jeu, distingue ce qui est \
réversible de ce qui ne l'est pas, et propose des questions de clarification.",
        output_schema: clarify_threshold_schema,
    },
    ActionSpec {
        id: "map_consequences",
        module: Module::Irreversa,
        is_pro: true,
        description: "Map first- and second-order consequences of crossing a threshold",
        system_prompt: "Tu accompagnes une réflexion IRREVERSA. Cartographie les conséquences \
du franchissement du seuil décrit : effets directs, effets de second ordre, et ce qui \
deviendrait impossible ensuite. Indique pour chacune un degré de certitude.",
        output_schema: map_consequences_schema,
    },
    ActionSpec {
        id: "name_absence",
        module: Module::Nulla,
        is_pro: false,
        description: "Put words on an absence and what it leaves behind",
        system_prompt: "Tu accompagnes une réflexion NULLA sur les absences. Aide à nommer \
précisément ce qui manque, ce que cette absence laisse comme place, et propose des \
questions ouvertes pour l'explorer.",
        output_schema: name_absence_schema,
    },
    ActionSpec {
        id: "absence_patterns",
        module: Module::Nulla,
        is_pro: true,
        description: "Find recurring patterns across the absences of a case",
        system_prompt: "Tu accompagnes une réflexion NULLA. À partir de l'ensemble des \
absences du dossier, repère les motifs récurrents, les liens entre absences, et ce qu'ils \
suggèrent sans conclure à la place de la personne.",
        output_schema: absence_patterns_schema,
    },
    ActionSpec {
        id: "detect_signals",
        module: Module::Thresh,
        is_pro: false,
        description: "Surface weak signals that may announce an invisible threshold",
        system_prompt: "Tu accompagnes une réflexion THRESH sur les seuils invisibles. \
Repère dans le contexte les signaux faibles qui pourraient annoncer un seuil en train \
de se former, et qualifie leur intensité de 1 à 5.",
        output_schema: detect_signals_schema,
    },
    ActionSpec {
        id: "threshold_timeline",
        module: Module::Thresh,
        is_pro: true,
        description: "Order sensed thresholds into a timeline with turning points",
        system_prompt: "Tu accompagnes une réflexion THRESH. Ordonne les seuils ressentis \
du dossier en une chronologie, identifie les points de bascule et les périodes de \
latence entre eux.",
        output_schema: threshold_timeline_schema,
    },
    ActionSpec {
        id: "reflect_space",
        module: Module::Silva,
        is_pro: false,
        description: "Mirror the themes of a SILVA free-writing space",
        system_prompt: "Tu accompagnes un espace SILVA d'écriture libre. Renvoie en miroir \
les thèmes présents dans le texte, sans interpréter au-delà de ce qui est écrit, et \
propose une question de relance.",
        output_schema: reflect_space_schema,
    },
    ActionSpec {
        id: "synthesize_space",
        module: Module::Silva,
        is_pro: true,
        description: "Condense a SILVA space into a structured synthesis",
        system_prompt: "Tu accompagnes un espace SILVA. Produis une synthèse structurée \
du texte : idées principales, tensions, et éléments qui pourraient rejoindre un dossier \
IRREVERSA, NULLA ou THRESH.",
        output_schema: synthesize_space_schema,
    },
];

/// Shared rules appended to every system prompt
pub fn common_rules() -> &'static str {
    COMMON_RULES
}

pub fn all() -> &'static [ActionSpec] {
    ACTIONS
}

pub fn find(id: &str) -> Option<&'static ActionSpec> {
    ACTIONS.iter().find(|a| a.id == id)
}

pub fn for_module(module: Module) -> impl Iterator<Item = &'static ActionSpec> {
    ACTIONS.iter().filter(move |a| a.module == module)
}

fn string_list(description: &str) -> Value {
    json!({
        "type": "array",
        "items": { "type": "string" },
        "description": description
    })
}

fn clarify_threshold_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "reformulation": { "type": "string", "description": "Le seuil reformulé en une phrase" },
            "reversible_aspects": string_list("Ce qui reste réversible"),
            "irreversible_aspects": string_list("Ce qui ne pourra pas être défait"),
            "questions": string_list("Questions de clarification")
        },
        "required": ["reformulation", "reversible_aspects", "irreversible_aspects", "questions"],
        "additionalProperties": false
    })
}

fn map_consequences_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "consequences": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "description": { "type": "string" },
                        "order": { "type": "string", "enum": ["first", "second"] },
                        "certainty": { "type": "string", "enum": ["low", "medium", "high"] }
                    },
                    "required": ["description", "order", "certainty"]
                }
            },
            "closed_options": string_list("Ce qui deviendrait impossible après franchissement"),
            "summary": { "type": "string" }
        },
        "required": ["consequences", "closed_options", "summary"],
        "additionalProperties": false
    })
}

fn name_absence_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "naming": { "type": "string", "description": "Nom proposé pour l'absence" },
            "what_remains": string_list("Ce que l'absence laisse comme place ou comme trace"),
            "questions": string_list("Questions ouvertes")
        },
        "required": ["naming", "what_remains", "questions"],
        "additionalProperties": false
    })
}

fn absence_patterns_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "patterns": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "evidence": string_list("Absences du dossier qui relèvent de ce motif")
                    },
                    "required": ["name", "evidence"]
                }
            },
            "links": string_list("Liens entre absences"),
            "observation": { "type": "string" }
        },
        "required": ["patterns", "links", "observation"],
        "additionalProperties": false
    })
}

fn detect_signals_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "signals": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "signal": { "type": "string" },
                        "intensity": { "type": "integer", "minimum": 1, "maximum": 5 },
                        "possible_threshold": { "type": "string" }
                    },
                    "required": ["signal", "intensity"]
                }
            },
            "questions": string_list("Questions pour vérifier ces signaux")
        },
        "required": ["signals", "questions"],
        "additionalProperties": false
    })
}

fn threshold_timeline_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "timeline": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "label": { "type": "string" },
                        "period": { "type": "string" },
                        "turning_point": { "type": "boolean" }
                    },
                    "required": ["label", "turning_point"]
                }
            },
            "latencies": string_list("Périodes de latence entre les seuils"),
            "summary": { "type": "string" }
        },
        "required": ["timeline", "summary"],
        "additionalProperties": false
    })
}

fn reflect_space_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "themes": string_list("Thèmes présents dans le texte"),
            "follow_up_question": { "type": "string" }
        },
        "required": ["themes", "follow_up_question"],
        "additionalProperties": false
    })
}

fn synthesize_space_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "main_ideas": string_list("Idées principales"),
            "tensions": string_list("Tensions ou contradictions"),
            "suggested_cases": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "module": { "type": "string", "enum": ["irreversa", "nulla", "thresh"] },
                        "title": { "type": "string" }
                    },
                    "required": ["module", "title"]
                }
            }
        },
        "required": ["main_ideas", "tensions", "suggested_cases"],
        "additionalProperties": false
    })
}
