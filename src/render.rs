//! Maps state machine directives to transport-neutral messages.

use crate::intake::{
    CallbackData, Directive, LanguageCode, Notice, Reply, Vacancy, VacancyCatalog,
};
use crate::locale::Text;

/// A button under a message that sends a callback payload back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub label: String,
    pub data: CallbackData,
}

impl InlineButton {
    pub fn new(label: impl Into<String>, data: CallbackData) -> Self {
        Self {
            label: label.into(),
            data,
        }
    }
}

/// Keyboard attached to an outgoing message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Keyboard {
    /// Leave whatever keyboard the client shows untouched.
    #[default]
    None,
    /// Rows of inline callback buttons.
    Inline(Vec<Vec<InlineButton>>),
    /// A single reply-keyboard button that shares the user's phone contact.
    RequestContact { label: String },
    /// Remove a previously shown reply keyboard.
    Remove,
}

/// A message ready to hand to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub text: String,
    pub keyboard: Keyboard,
    /// Whether `text` uses Markdown emphasis.
    pub markdown: bool,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Keyboard::None,
            markdown: false,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = keyboard;
        self
    }

    pub fn with_markdown(mut self) -> Self {
        self.markdown = true;
        self
    }
}

/// Render a reply. `Ignore` renders to nothing.
pub fn render(reply: &Reply, catalog: &VacancyCatalog) -> Option<OutgoingMessage> {
    let lang = reply.language;
    let msg = match &reply.directive {
        Directive::ShowLanguageMenu => language_menu(lang),
        Directive::ShowVacancyList => vacancy_list(lang, catalog),
        Directive::ShowVacancyDetail(vacancy) => vacancy_detail(lang, vacancy),
        Directive::PromptName => OutgoingMessage::text(Text::StartApplication.get(lang)),
        Directive::PromptPhone => OutgoingMessage::text(Text::SharePhone.get(lang))
            .with_keyboard(Keyboard::RequestContact {
                label: Text::ButtonSharePhone.get(lang).to_string(),
            }),
        Directive::PromptCv => {
            OutgoingMessage::text(Text::GreatUploadCv.get(lang)).with_keyboard(Keyboard::Remove)
        }
        Directive::RepromptCv => OutgoingMessage::text(Text::UploadCv.get(lang)),
        Directive::PromptVoice | Directive::RepromptVoice => {
            OutgoingMessage::text(Text::RecordVoice.get(lang))
        }
        Directive::Submit(_) => OutgoingMessage::text(Text::ApplicationComplete.get(lang)),
        Directive::ShowError(Notice::VacancyUnavailable) => {
            OutgoingMessage::text(Text::VacancyUnavailable.get(lang))
        }
        Directive::Ignore => return None,
    };
    Some(msg)
}

/// Message shown when an application had to be aborted.
pub fn render_internal_error(lang: LanguageCode) -> OutgoingMessage {
    OutgoingMessage::text(Text::SomethingWentWrong.get(lang)).with_keyboard(Keyboard::Remove)
}

fn language_menu(lang: LanguageCode) -> OutgoingMessage {
    let rows = LanguageCode::ALL
        .iter()
        .map(|&code| vec![InlineButton::new(code.label(), CallbackData::Language(code))])
        .collect();
    OutgoingMessage::text(Text::ChooseLanguage.get(lang)).with_keyboard(Keyboard::Inline(rows))
}

fn vacancy_list(lang: LanguageCode, catalog: &VacancyCatalog) -> OutgoingMessage {
    let rows = catalog
        .list()
        .iter()
        .map(|v| vec![InlineButton::new(v.title(lang), CallbackData::Vacancy(v.id))])
        .collect();
    OutgoingMessage::text(Text::AvailableVacancies.get(lang)).with_keyboard(Keyboard::Inline(rows))
}

fn vacancy_detail(lang: LanguageCode, vacancy: &Vacancy) -> OutgoingMessage {
    let mut text = format!("📌 *{}*", vacancy.title(lang));

    let requirements = vacancy.requirements(lang);
    if !requirements.is_empty() {
        text.push_str(&format!("\n\n✅ *{}*\n{requirements}", Text::Requirements.get(lang)));
    }

    let questions = vacancy.questions(lang);
    if !questions.is_empty() {
        let list = questions
            .iter()
            .map(|q| format!("❓ {q}"))
            .collect::<Vec<_>>()
            .join("\n");
        text.push_str(&format!("\n\n📝 *{}*\n{list}", Text::Questions.get(lang)));
    }

    let rows = vec![
        vec![InlineButton::new(
            Text::ButtonApply.get(lang),
            CallbackData::StartApplication,
        )],
        vec![InlineButton::new(
            Text::ButtonBack.get(lang),
            CallbackData::BackToVacancies,
        )],
    ];

    OutgoingMessage::text(text)
        .with_keyboard(Keyboard::Inline(rows))
        .with_markdown()
}
