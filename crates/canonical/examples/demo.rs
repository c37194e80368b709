use canonical::{clean, LanguageResources, Parser, DEFAULT_LANGUAGE};

fn main() {
    let input = std::env::args().nth(1).unwrap_or_else(|| {
        "Argus Panoptes,\u{00A0}the  all-seeing giant, was set to watch over Io.".to_string()
    });

    let resources =
        LanguageResources::builtin(&["en", "de", "fr"], DEFAULT_LANGUAGE).expect("builtin languages");
    let cleaned = clean(&input);
    let language = resources.detect_language(&cleaned.text);
    let stopper = resources.stopper(&language);
    let stemmer = resources.stemmer(&language);

    let occurrences = Parser::new().parse(&cleaned.text, stopper.as_deref(), stemmer.as_deref(), true);

    println!("cleaned:  {}", cleaned.text);
    println!("language: {language}");
    println!();
    for occurrence in &occurrences {
        let start = cleaned.source_offset(occurrence.start);
        let end = cleaned.source_offset(occurrence.end);
        println!(
            "{:>3}  {:<12} {:?}",
            occurrence.word_index,
            occurrence.text,
            &input[start..end]
        );
    }
}
