//! Built-in stopword lists.
//!
//! Entries are stored as written; [`WordListStopper`](crate::WordListStopper)
//! folds them through the cleaner and lower-cases them on construction, so
//! accents in these lists are harmless.

pub(crate) const ENGLISH: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just",
    "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once",
    "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same", "she",
    "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours", "yourself",
    "yourselves",
];

pub(crate) const GERMAN: &[&str] = &[
    "aber", "alle", "als", "also", "am", "an", "auch", "auf", "aus", "bei", "bin", "bis", "bist",
    "da", "dann", "das", "dass", "dem", "den", "der", "des", "die", "dies", "diese", "dieser",
    "doch", "du", "durch", "ein", "eine", "einem", "einen", "einer", "eines", "er", "es", "für",
    "hat", "hatte", "ich", "ihr", "im", "in", "ist", "ja", "kann", "mit", "nach", "nicht", "noch",
    "nur", "ob", "oder", "sehr", "sich", "sie", "sind", "so", "über", "um", "und", "uns", "unter",
    "vom", "von", "vor", "war", "was", "weil", "wenn", "wie", "wir", "wird", "zu", "zum", "zur",
];

pub(crate) const FRENCH: &[&str] = &[
    "au", "aux", "avec", "ce", "ces", "dans", "de", "des", "du", "elle", "elles", "en", "est",
    "et", "être", "été", "il", "ils", "je", "la", "le", "les", "leur", "lui", "ma", "mais", "me",
    "même", "mes", "moi", "mon", "ne", "nos", "notre", "nous", "on", "ou", "où", "par", "pas",
    "pour", "qu", "que", "qui", "sa", "se", "ses", "son", "sur", "ta", "te", "tes", "toi", "ton",
    "tu", "un", "une", "vos", "votre", "vous", "y",
];

pub(crate) const SPANISH: &[&str] = &[
    "a", "al", "algo", "como", "con", "cuando", "de", "del", "desde", "donde", "el", "ella",
    "ellos", "en", "entre", "era", "es", "esa", "ese", "esta", "este", "está", "fue", "ha", "hay",
    "la", "las", "le", "les", "lo", "los", "más", "me", "mi", "muy", "ni", "no", "nos", "o",
    "para", "pero", "por", "que", "qué", "se", "sin", "sobre", "son", "su", "sus", "también",
    "te", "tu", "un", "una", "uno", "y", "ya", "yo",
];

pub(crate) const ITALIAN: &[&str] = &[
    "a", "ad", "al", "alla", "alle", "anche", "che", "chi", "ci", "come", "con", "da", "dal",
    "dei", "del", "della", "delle", "di", "e", "è", "era", "gli", "ha", "hanno", "i", "il", "in",
    "io", "la", "le", "lei", "lo", "lui", "ma", "mi", "ne", "nel", "nella", "noi", "non", "o",
    "per", "più", "quella", "quello", "questa", "questo", "se", "si", "sono", "su", "sua", "suo",
    "tra", "tu", "un", "una", "uno", "voi",
];

pub(crate) const PORTUGUESE: &[&str] = &[
    "a", "ao", "aos", "as", "até", "com", "como", "da", "das", "de", "dela", "dele", "do", "dos",
    "e", "é", "ela", "ele", "eles", "em", "entre", "era", "essa", "esse", "esta", "este", "eu",
    "foi", "há", "isso", "já", "lhe", "mais", "mas", "me", "mesmo", "muito", "na", "nas", "não",
    "nem", "no", "nos", "nós", "o", "os", "ou", "para", "pela", "pelo", "por", "quando", "que",
    "se", "sem", "ser", "seu", "sua", "são", "também", "te", "um", "uma", "você",
];

pub(crate) const DUTCH: &[&str] = &[
    "aan", "al", "alles", "als", "bij", "dan", "dat", "de", "der", "deze", "die", "dit", "doch",
    "door", "een", "en", "er", "ge", "geen", "had", "heb", "hebben", "heeft", "hem", "het", "hij",
    "hoe", "hun", "ik", "in", "is", "ja", "je", "kan", "maar", "me", "meer", "men", "met", "mij",
    "na", "naar", "niet", "nog", "nu", "of", "om", "ons", "ook", "op", "over", "te", "tot", "u",
    "uit", "van", "veel", "voor", "was", "wat", "we", "wel", "werd", "wie", "wij", "zal", "ze",
    "zich", "zij", "zijn", "zo", "zou",
];

/// Built-in list for a language code, if one ships with the crate.
pub(crate) fn builtin(code: &str) -> Option<&'static [&'static str]> {
    match code {
        "en" => Some(ENGLISH),
        "de" => Some(GERMAN),
        "fr" => Some(FRENCH),
        "es" => Some(SPANISH),
        "it" => Some(ITALIAN),
        "pt" => Some(PORTUGUESE),
        "nl" => Some(DUTCH),
        _ => None,
    }
}
