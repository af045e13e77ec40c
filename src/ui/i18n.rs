//! Interface labels in the supported languages.

use std::fmt;
use std::str::FromStr;

use crate::ui::theme::ThemeName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    En,
    #[default]
    Zh,
    Ja,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::En, Language::Zh, Language::Ja];

    pub fn as_str(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Zh => "zh",
            Language::Ja => "ja",
        }
    }

    pub fn labels(self) -> &'static Labels {
        match self {
            Language::En => &EN,
            Language::Zh => &ZH,
            Language::Ja => &JA,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|lang| lang.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown language: {s}"))
    }
}

#[derive(Debug)]
pub struct Labels {
    pub thinking_process: &'static str,
    pub tools: &'static str,
    pub running: &'static str,
    pub completed: &'static str,
    pub parse_error: &'static str,
    pub generating: &'static str,
    pub interrupted: &'static str,
    pub stop: &'static str,
    pub copy: &'static str,
    pub copied: &'static str,
    pub preview: &'static str,
    pub code: &'static str,
    pub jump_to_bottom: &'static str,
    pub search_placeholder: &'static str,
    pub no_messages_found: &'static str,
    pub theme: &'static str,
    pub language: &'static str,
    pub providers: &'static str,
    pub models: &'static str,
    pub default: &'static str,
    pub error: &'static str,
    /// Indexed like [`ThemeName::ALL`].
    themes: [&'static str; 6],
}

impl Labels {
    pub fn theme_name(&self, theme: ThemeName) -> &'static str {
        let index = ThemeName::ALL
            .iter()
            .position(|t| *t == theme)
            .unwrap_or(0);
        self.themes[index]
    }
}

const EN: Labels = Labels {
    thinking_process: "Thinking Process",
    tools: "TOOLS",
    running: "RUNNING",
    completed: "DONE",
    parse_error: "PARSING ERROR",
    generating: "GENERATING...",
    interrupted: "Interrupted by user.",
    stop: "STOP",
    copy: "Copy",
    copied: "Copied!",
    preview: "PREVIEW",
    code: "CODE",
    jump_to_bottom: "Jump to bottom",
    search_placeholder: "Search messages...",
    no_messages_found: "No messages found.",
    theme: "Theme",
    language: "Language",
    providers: "PROVIDERS",
    models: "MODELS",
    default: "DEFAULT",
    error: "ERROR",
    themes: [
        "NIGHT MODE",
        "DAY MODE",
        "SHADCN DARK",
        "SHADCN LIGHT",
        "CYBER NEON",
        "SUNSET GLOW",
    ],
};

const ZH: Labels = Labels {
    thinking_process: "思考过程",
    tools: "工具",
    running: "运行中",
    completed: "已完成",
    parse_error: "解析错误",
    generating: "生成中...",
    interrupted: "用户已中断。",
    stop: "停止",
    copy: "复制",
    copied: "已复制!",
    preview: "预览",
    code: "代码",
    jump_to_bottom: "回到底部",
    search_placeholder: "搜索消息...",
    no_messages_found: "未找到消息。",
    theme: "主题",
    language: "语言",
    providers: "服务商",
    models: "模型列表",
    default: "默认",
    error: "错误",
    themes: [
        "夜间模式",
        "日间模式",
        "Shadcn 深色",
        "Shadcn 浅色",
        "赛博霓虹",
        "落日余晖",
    ],
};

const JA: Labels = Labels {
    thinking_process: "思考プロセス",
    tools: "ツール",
    running: "実行中",
    completed: "完了",
    parse_error: "解析エラー",
    generating: "生成中...",
    interrupted: "ユーザーによって中断されました。",
    stop: "停止",
    copy: "コピー",
    copied: "コピーしました!",
    preview: "プレビュー",
    code: "コード",
    jump_to_bottom: "最下部へ",
    search_placeholder: "メッセージ検索...",
    no_messages_found: "メッセージが見つかりません。",
    theme: "テーマ",
    language: "言語",
    providers: "プロバイダー",
    models: "モデル",
    default: "デフォルト",
    error: "エラー",
    themes: [
        "ナイトモード",
        "デイモード",
        "Shadcn ダーク",
        "Shadcn ライト",
        "サイバー NEON",
        "サンセット グロー",
    ],
};
