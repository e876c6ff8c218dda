use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    Uz,
    Ru,
}

impl Lang {
    pub fn code(self) -> &'static str {
        match self {
            Lang::Uz => "uz",
            Lang::Ru => "ru",
        }
    }

    pub fn parse(code: &str) -> Option<Lang> {
        match code.to_ascii_lowercase().as_str() {
            "uz" => Some(Lang::Uz),
            "ru" => Some(Lang::Ru),
            _ => None,
        }
    }

    pub fn t(self, key: Key) -> &'static str {
        match self {
            Lang::Uz => uz(key),
            Lang::Ru => ru(key),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Title,
    MenuUser,
    MenuAdmin,
    AdLabel,
    NoFiles,
    LoginUser,
    LoginPass,
    LoginBtn,
    LogoutBtn,
    AdSettings,
    AdText,
    AdActive,
    AdSave,
    AdHours,
    AdHoursHelp,
    UploadHeader,
    UploadLabel,
    UploadBtn,
    FilesList,
    DeleteBtn,
    DownloadBtn,
    Settings,
    ChangePass,
    NewPass,
    SavePass,
    SuccessPass,
    SuccessAd,
    SuccessUpload,
    ErrorUpload,
    LoginSuccess,
    LoginFail,
    Welcome,
    DarkMode,
    Search,
    SearchPlaceholder,
    AllTypes,
    CreateFolder,
    FolderName,
    Create,
    Rename,
    NewName,
    Save,
    Back,
    CurrentPath,
    SelectFolder,
    Comment,
    WriteComment,
    Top5,
    Downloads,
    PassEmptyWarning,
    RootFolder,
    AdminStats,
    StatFile,
    StatCount,
    ActionFailed,
}

fn uz(key: Key) -> &'static str {
    match key {
        Key::Title => "Toshmi Baza Websayt",
        Key::MenuUser => "Asosiy Sahifa",
        Key::MenuAdmin => "Admin Paneli",
        Key::AdLabel => "E'LON",
        Key::NoFiles => "Hozircha fayllar mavjud emas.",
        Key::LoginUser => "Foydalanuvchi nomi",
        Key::LoginPass => "Parol",
        Key::LoginBtn => "Kirish",
        Key::LogoutBtn => "Chiqish",
        Key::AdSettings => "Reklama Sozlamalari",
        Key::AdText => "Reklama matni",
        Key::AdActive => "Reklamani yoqish",
        Key::AdSave => "Reklamani Saqlash",
        Key::AdHours => "Reklama muddati (soat)",
        Key::AdHoursHelp => "0 kiritilsa, reklama o'chirilmaguncha turadi.",
        Key::UploadHeader => "Admin orqali fayl yuklash",
        Key::UploadLabel => "Fayl yuklash",
        Key::UploadBtn => "Admin sifatida yuklash",
        Key::FilesList => "Fayllar va Papkalar",
        Key::DeleteBtn => "O'chirish",
        Key::DownloadBtn => "Yuklab olish",
        Key::Settings => "Sozlamalar",
        Key::ChangePass => "Parolni o'zgartirish",
        Key::NewPass => "Yangi parol",
        Key::SavePass => "Parolni saqlash",
        Key::SuccessPass => "Parol muvaffaqiyatli yangilandi!",
        Key::SuccessAd => "Reklama muvaffaqiyatli yangilandi!",
        Key::SuccessUpload => "saqlandi!",
        Key::ErrorUpload => "Xatolik yuz berdi.",
        Key::LoginSuccess => "Tizimga kirdingiz!",
        Key::LoginFail => "Login yoki parol noto'g'ri",
        Key::Welcome => "Siz Admin sifatida tizimdasiz",
        Key::DarkMode => "Tungi rejim",
        Key::Search => "Qidirish",
        Key::SearchPlaceholder => "Fayllarni qidirish...",
        Key::AllTypes => "Barchasi",
        Key::CreateFolder => "Yangi papka yaratish",
        Key::FolderName => "Papka nomi",
        Key::Create => "Yaratish",
        Key::Rename => "Tahrirlash",
        Key::NewName => "Yangi nom",
        Key::Save => "Saqlash",
        Key::Back => "Orqaga",
        Key::CurrentPath => "Joriy papka",
        Key::SelectFolder => "Qaysi papkaga yuklansin?",
        Key::Comment => "Izoh",
        Key::WriteComment => "Izoh yozing...",
        Key::Top5 => "Eng ko'p yuklanganlar (Top 5)",
        Key::Downloads => "marta yuklandi",
        Key::PassEmptyWarning => "Parol bo'sh bo'lmasligi kerak",
        Key::RootFolder => "Asosiy papka (Root)",
        Key::AdminStats => "Yuklashlar Statistikasi",
        Key::StatFile => "Fayl nomi",
        Key::StatCount => "Yuklashlar soni",
        Key::ActionFailed => "Amal bajarilmadi.",
    }
}

fn ru(key: Key) -> &'static str {
    match key {
        Key::Title => "Веб-сайт базы Тошми",
        Key::MenuUser => "Главная страница",
        Key::MenuAdmin => "Панель администратора",
        Key::AdLabel => "ОБЪЯВЛЕНИЕ",
        Key::NoFiles => "Файлов пока нет.",
        Key::LoginUser => "Имя пользователя",
        Key::LoginPass => "Пароль",
        Key::LoginBtn => "Войти",
        Key::LogoutBtn => "Выйти",
        Key::AdSettings => "Настройки рекламы",
        Key::AdText => "Текст рекламы",
        Key::AdActive => "Включить рекламу",
        Key::AdSave => "Сохранить рекламу",
        Key::AdHours => "Длительность рекламы (часы)",
        Key::AdHoursHelp => "Если 0, реклама будет висеть пока не отключите.",
        Key::UploadHeader => "Загрузка файлов (Админ)",
        Key::UploadLabel => "Загрузить файл",
        Key::UploadBtn => "Загрузить как админ",
        Key::FilesList => "Файлы и папки",
        Key::DeleteBtn => "Удалить",
        Key::DownloadBtn => "Скачать",
        Key::Settings => "Настройки",
        Key::ChangePass => "Изменить пароль",
        Key::NewPass => "Новый пароль",
        Key::SavePass => "Сохранить пароль",
        Key::SuccessPass => "Пароль успешно обновлен!",
        Key::SuccessAd => "Реклама успешно обновлена!",
        Key::SuccessUpload => "сохранен!",
        Key::ErrorUpload => "Произошла ошибка.",
        Key::LoginSuccess => "Вы вошли в систему!",
        Key::LoginFail => "Неверный логин или пароль",
        Key::Welcome => "Вы вошли как администратор",
        Key::DarkMode => "Ночной режим",
        Key::Search => "Поиск",
        Key::SearchPlaceholder => "Поиск файлов...",
        Key::AllTypes => "Все",
        Key::CreateFolder => "Создать новую папку",
        Key::FolderName => "Имя папки",
        Key::Create => "Создать",
        Key::Rename => "Редактировать",
        Key::NewName => "Новое имя",
        Key::Save => "Сохранить",
        Key::Back => "Назад",
        Key::CurrentPath => "Текущий путь",
        Key::SelectFolder => "В какую папку загрузить?",
        Key::Comment => "Комментарий",
        Key::WriteComment => "Напишите комментарий...",
        Key::Top5 => "Топ 5 скачиваний",
        Key::Downloads => "скачиваний",
        Key::PassEmptyWarning => "Пароль не должен быть пустым",
        Key::RootFolder => "Главная папка (Root)",
        Key::AdminStats => "Статистика скачиваний",
        Key::StatFile => "Имя файла",
        Key::StatCount => "Количество скачиваний",
        Key::ActionFailed => "Действие не выполнено.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for lang in [Lang::Uz, Lang::Ru] {
            assert_eq!(Lang::parse(lang.code()), Some(lang));
        }
        assert_eq!(Lang::parse("RU"), Some(Lang::Ru));
        assert_eq!(Lang::parse("en"), None);
    }

    #[test]
    fn locales_differ() {
        assert_ne!(Lang::Uz.t(Key::LoginBtn), Lang::Ru.t(Key::LoginBtn));
    }
}
