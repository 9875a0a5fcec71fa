//! YAYA family policy: a closed set of known events plus the built-in function table.

use serde_json::Value;
use std::collections::BTreeMap;

use super::expr;
use super::variables::VariableStore;
use super::pick;
use crate::error::{ShioriError, ShioriResult};
use crate::host::RandomSource;
use crate::protocol::{Request, Response};

const BOOT_PHRASES: &[&str] = &[
    "おかえりなさい！",
    "お疲れ様です！",
    "また会えましたね♪",
    "今日もよろしくお願いします！",
];

const FIRST_BOOT_PHRASES: &[&str] = &["はじめまして！私はナナイです。よろしくお願いします♪"];

const MOUSE_CLICK_PHRASES: &[&str] = &[
    "くすぐったいです〜",
    "なでなでありがとう♪",
    "そこは敏感なところです...",
    "もっと撫でてください！",
    "うふふ、楽しいですね",
];

const RANDOM_PHRASES: &[&str] = &[
    "何か面白いことないかな〜",
    "ちょっと退屈になってきました",
    "今日はいい天気ですね！",
    "お疲れではありませんか？",
    "一緒に何かしませんか？",
    "そういえば、最近どうですか？",
];

const TIME_SIGNAL_PHRASES: &[&str] = &["時報！正時をお知らせします。"];

const CLOSE_PHRASES: &[&str] = &["また後でお会いしましょう！"];

/// Events a YAYA engine answers. Anything else lands in `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YayaEvent<'a> {
    Boot,
    FirstBoot,
    MouseClick,
    Random,
    SecondChange,
    MinuteChange,
    Close,
    Unknown(&'a str),
}

impl<'a> YayaEvent<'a> {
    pub fn from_id(id: &'a str) -> Self {
        match id {
            "OnBoot" => YayaEvent::Boot,
            "OnFirstBoot" => YayaEvent::FirstBoot,
            "OnMouseClick" => YayaEvent::MouseClick,
            "OnRandom" => YayaEvent::Random,
            "OnSecondChange" => YayaEvent::SecondChange,
            "OnMinuteChange" => YayaEvent::MinuteChange,
            "OnClose" => YayaEvent::Close,
            other => YayaEvent::Unknown(other),
        }
    }
}

/// YAYA built-in functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YayaFunction {
    Get,
    Set,
    Eval,
    FunctionEx,
    ArraySize,
    Logging,
}

impl YayaFunction {
    pub const ALL: [YayaFunction; 6] = [
        YayaFunction::Get,
        YayaFunction::Set,
        YayaFunction::Eval,
        YayaFunction::FunctionEx,
        YayaFunction::ArraySize,
        YayaFunction::Logging,
    ];

    pub fn name(self) -> &'static str {
        match self {
            YayaFunction::Get => "GET",
            YayaFunction::Set => "SET",
            YayaFunction::Eval => "EVAL",
            YayaFunction::FunctionEx => "FUNCTIONEX",
            YayaFunction::ArraySize => "ARRAYSIZE",
            YayaFunction::Logging => "LOGGING",
        }
    }
}

#[derive(Debug, Clone)]
pub struct YayaPolicy {
    functions: BTreeMap<String, YayaFunction>,
}

impl Default for YayaPolicy {
    fn default() -> Self {
        let functions = YayaFunction::ALL
            .iter()
            .map(|f| (f.name().to_string(), *f))
            .collect();
        Self { functions }
    }
}

impl YayaPolicy {
    pub fn respond(&self, request: &Request, random: &dyn RandomSource) -> ShioriResult<Response> {
        let event = YayaEvent::from_id(&request.event);
        let response = match event {
            YayaEvent::Boot => Response::talk(pick(BOOT_PHRASES, random)?, "0", "OnBoot"),
            YayaEvent::FirstBoot => Response::talk(pick(FIRST_BOOT_PHRASES, random)?, "0", "OnFirstBoot"),
            YayaEvent::MouseClick => {
                let part = request.reference(2);
                tracing::debug!(x = request.reference(0), y = request.reference(1), part, "YAYA mouse click");
                let surface = if part == "head" { "1" } else { "0" };
                Response::talk(pick(MOUSE_CLICK_PHRASES, random)?, surface, "OnMouseClick")
            }
            YayaEvent::Random => Response::talk(pick(RANDOM_PHRASES, random)?, "0", "OnRandom"),
            YayaEvent::SecondChange => Response::no_content(),
            YayaEvent::MinuteChange => match request.reference(0).trim().parse::<i64>() {
                Ok(0) => Response::talk(pick(TIME_SIGNAL_PHRASES, random)?, "0", "OnMinuteChange"),
                _ => Response::no_content(),
            },
            YayaEvent::Close => Response::talk(pick(CLOSE_PHRASES, random)?, "0", "OnClose"),
            YayaEvent::Unknown(name) => {
                tracing::warn!(event = name, "YAYA: unsupported event");
                Response::talk(
                    format!("申し訳ありません、{}イベントはまだ対応していません。", name),
                    "0",
                    name,
                )
            }
        };
        Ok(response)
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn clear(&mut self) {
        self.functions.clear();
    }

    pub fn call_function(
        &self,
        name: &str,
        args: &[&str],
        variables: &mut VariableStore,
    ) -> ShioriResult<String> {
        let function = *self
            .functions
            .get(name)
            .ok_or_else(|| ShioriError::UnknownFunction(name.to_string()))?;
        let arg = |i: usize| args.get(i).copied().unwrap_or("");

        match function {
            YayaFunction::Get => Ok(variables.get_text(arg(0))),
            YayaFunction::Set => {
                let value = arg(1).to_string();
                variables.set(arg(0), Value::String(value.clone()));
                Ok(value)
            }
            YayaFunction::Eval => {
                let input = arg(0);
                if !expr::is_arithmetic(input) {
                    return Ok("Invalid expression".to_string());
                }
                expr::evaluate(input).map(expr::format_number)
            }
            YayaFunction::FunctionEx => {
                let target = args.first().ok_or_else(|| ShioriError::UnknownFunction(String::new()))?;
                self.call_function(target, &args[1..], variables)
            }
            YayaFunction::ArraySize => Ok(match variables.raw(arg(0)) {
                Some(Value::Array(items)) => items.len().to_string(),
                _ => "0".to_string(),
            }),
            YayaFunction::Logging => {
                tracing::info!(text = %args.join(" "), "YAYA log");
                Ok("OK".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ScriptedRandom;

    fn request(raw: &str) -> Request {
        Request::parse(raw).unwrap()
    }

    #[test]
    fn test_mouse_click_head_surface() {
        let policy = YayaPolicy::default();
        let rng = ScriptedRandom::constant(1);
        let resp = policy
            .respond(&request("GET SHIORI/3.0\r\nID: OnMouseClick\r\nReference2: head\r\n"), &rng)
            .unwrap();
        assert_eq!(resp.value(), Some("なでなでありがとう♪"));
        assert_eq!(resp.header("Surface"), Some("1"));

        let resp = policy
            .respond(&request("GET SHIORI/3.0\r\nID: OnMouseClick\r\nReference2: body\r\n"), &rng)
            .unwrap();
        assert_eq!(resp.header("Surface"), Some("0"));
    }

    #[test]
    fn test_minute_change_only_on_the_hour() {
        let policy = YayaPolicy::default();
        let rng = ScriptedRandom::constant(0);
        let on_hour = policy
            .respond(&request("GET SHIORI/3.0\r\nID: OnMinuteChange\r\nReference0: 0\r\n"), &rng)
            .unwrap();
        assert_eq!(on_hour.status, 200);
        assert_eq!(on_hour.value(), Some("時報！正時をお知らせします。"));

        for raw in [
            "GET SHIORI/3.0\r\nID: OnMinuteChange\r\nReference0: 15\r\n",
            "GET SHIORI/3.0\r\nID: OnMinuteChange\r\n",
            "GET SHIORI/3.0\r\nID: OnMinuteChange\r\nReference0: soon\r\n",
        ] {
            assert_eq!(policy.respond(&request(raw), &rng).unwrap().status, 204);
        }
    }

    #[test]
    fn test_out_of_range_pick_is_error() {
        let policy = YayaPolicy::default();
        let rng = ScriptedRandom::constant(99);
        let result = policy.respond(&request("GET SHIORI/3.0\r\nID: OnBoot\r\n"), &rng);
        assert!(matches!(result, Err(ShioriError::InvalidIndex { index: 99, len: 4 })));
    }

    #[test]
    fn test_builtin_functions() {
        let policy = YayaPolicy::default();
        let mut vars = VariableStore::default();

        assert_eq!(policy.call_function("SET", &["mood", "happy"], &mut vars).unwrap(), "happy");
        assert_eq!(policy.call_function("GET", &["mood"], &mut vars).unwrap(), "happy");
        assert_eq!(policy.call_function("EVAL", &["(2 + 3) * 4"], &mut vars).unwrap(), "20");
        assert_eq!(policy.call_function("EVAL", &["rm -rf"], &mut vars).unwrap(), "Invalid expression");
        assert!(policy.call_function("EVAL", &["1/0"], &mut vars).is_err());
        assert_eq!(
            policy.call_function("FUNCTIONEX", &["GET", "mood"], &mut vars).unwrap(),
            "happy"
        );
        assert_eq!(policy.call_function("LOGGING", &["hello"], &mut vars).unwrap(), "OK");

        vars.set("items", serde_json::json!(["a", "b", "c"]));
        assert_eq!(policy.call_function("ARRAYSIZE", &["items"], &mut vars).unwrap(), "3");
        assert_eq!(policy.call_function("ARRAYSIZE", &["mood"], &mut vars).unwrap(), "0");

        assert!(matches!(
            policy.call_function("NOPE", &[], &mut vars),
            Err(ShioriError::UnknownFunction(_))
        ));
    }

    #[test]
    fn test_eval_rejects_runaway_nesting() {
        let policy = YayaPolicy::default();
        let mut vars = VariableStore::default();
        let deep = "(".repeat(5_000);
        assert!(matches!(
            policy.call_function("EVAL", &[deep.as_str()], &mut vars),
            Err(ShioriError::Expression(_))
        ));
        assert_eq!(policy.call_function("EVAL", &["((1 + 1))"], &mut vars).unwrap(), "2");
    }
}
