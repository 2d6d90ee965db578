//! Fixed interface strings in every supported language.

use crate::intake::LanguageCode;

/// Keys for the bot's interface strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Text {
    ChooseLanguage,
    AvailableVacancies,
    Requirements,
    Questions,
    StartApplication,
    SharePhone,
    UploadCv,
    GreatUploadCv,
    RecordVoice,
    ApplicationComplete,
    VacancyUnavailable,
    SomethingWentWrong,
    ButtonApply,
    ButtonBack,
    ButtonSharePhone,
}

impl Text {
    pub fn get(self, lang: LanguageCode) -> &'static str {
        use LanguageCode::*;
        match (self, lang) {
            (Self::ChooseLanguage, En) => "Please choose your language:",
            (Self::ChooseLanguage, Ru) => "Выберите язык:",
            (Self::ChooseLanguage, Uz) => "Tilni tanlang:",

            (Self::AvailableVacancies, En) => "Available vacancies:",
            (Self::AvailableVacancies, Ru) => "Доступные вакансии:",
            (Self::AvailableVacancies, Uz) => "Mavjud bo‘sh ish o‘rinlari:",

            (Self::Requirements, En) => "Requirements:",
            (Self::Requirements, Ru) => "Требования:",
            (Self::Requirements, Uz) => "Talablar:",

            (Self::Questions, En) => "Questions:",
            (Self::Questions, Ru) => "Вопросы:",
            (Self::Questions, Uz) => "Savollar:",

            (Self::StartApplication, En) => {
                "Let's begin your application.\nPlease enter your full name:"
            }
            (Self::StartApplication, Ru) => "Давайте начнём заявку.\nВведите полное имя:",
            (Self::StartApplication, Uz) => "Arizani boshlaymiz.\nTo‘liq ismingizni kiriting:",

            (Self::SharePhone, En) => "Now share your phone number:",
            (Self::SharePhone, Ru) => "Поделитесь номером телефона:",
            (Self::SharePhone, Uz) => "Telefon raqamingizni ulashing:",

            (Self::UploadCv, En) => "Please upload your CV as a document.",
            (Self::UploadCv, Ru) => "Загрузите резюме файлом.",
            (Self::UploadCv, Uz) => "Rezyumeni hujjat sifatida yuklang.",

            (Self::GreatUploadCv, En) => "Great 👍 Now upload your CV:",
            (Self::GreatUploadCv, Ru) => "Отлично 👍 Загрузите резюме:",
            (Self::GreatUploadCv, Uz) => "Zo‘r 👍 Rezyumeni yuklang:",

            (Self::RecordVoice, En) => "Please record a voice message about your experience.",
            (Self::RecordVoice, Ru) => "Запишите голосовое сообщение о своём опыте.",
            (Self::RecordVoice, Uz) => "Tajribangiz haqida ovozli xabar yozing.",

            (Self::ApplicationComplete, En) => "🎉 Your application is complete! Thank you.",
            (Self::ApplicationComplete, Ru) => "🎉 Заявка завершена! Спасибо.",
            (Self::ApplicationComplete, Uz) => "🎉 Ariza yakunlandi! Rahmat.",

            (Self::VacancyUnavailable, En) => "This vacancy is no longer available.",
            (Self::VacancyUnavailable, Ru) => "Эта вакансия больше недоступна.",
            (Self::VacancyUnavailable, Uz) => "Bu bo‘sh ish o‘rni endi mavjud emas.",

            (Self::SomethingWentWrong, En) => {
                "Something went wrong. Please start your application again."
            }
            (Self::SomethingWentWrong, Ru) => {
                "Что-то пошло не так. Пожалуйста, начните заявку заново."
            }
            (Self::SomethingWentWrong, Uz) => {
                "Xatolik yuz berdi. Iltimos, arizani qaytadan boshlang."
            }

            (Self::ButtonApply, En) => "✅ Apply",
            (Self::ButtonApply, Ru) => "✅ Откликнуться",
            (Self::ButtonApply, Uz) => "✅ Murojaat",

            (Self::ButtonBack, En) => "🔙 Go back",
            (Self::ButtonBack, Ru) => "🔙 Назад",
            (Self::ButtonBack, Uz) => "🔙 Orqaga",

            (Self::ButtonSharePhone, En) => "Share phone",
            (Self::ButtonSharePhone, Ru) => "Поделиться телефоном",
            (Self::ButtonSharePhone, Uz) => "Telefonni ulashish",
        }
    }
}
