use std::fs;
use std::path::PathBuf;

use tagquery::ast::MetaType;
use tagquery::settings::{Loader, load_defaults};
use tagquery::{Compiler, Generator, TagQueryError, Vocabulary};

fn scratch_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("tagquery-{}-{}.toml", name, std::process::id()));
    fs::write(&path, contents).expect("scratch config to be written");
    path
}

#[test]
fn user_file_overrides_defaults() {
    let path = scratch_file(
        "user",
        "[generator]\nindent_size = 2\n\n[metatags]\ninteger = [\"rank\"]\n",
    );
    let settings = Loader::new().without_environment().with_file(&path).build().expect("settings");
    fs::remove_file(&path).ok();

    assert_eq!(settings.generator.indent_size, 2);
    assert_eq!(settings.generator.indent_char, ' ');
    // untouched lists keep their defaults
    assert!(settings.metatags.string.contains(&"title".to_string()));

    let vocabulary = Vocabulary::from_settings(&settings.metatags);
    assert_eq!(vocabulary.classify("rank"), Some(MetaType::Integer));
}

#[test]
fn missing_required_file_is_a_config_error() {
    let missing = std::env::temp_dir().join("tagquery-does-not-exist.toml");
    let result = Loader::new().without_environment().with_file(&missing).build();
    assert!(matches!(result, Err(TagQueryError::Config(_))));
}

#[test]
fn missing_optional_file_is_ignored() {
    let missing = std::env::temp_dir().join("tagquery-optional-missing.toml");
    let settings = Loader::new().without_environment().with_optional_file(&missing).build().expect("settings");
    assert_eq!(settings.logging.filter, "warn");
}

#[test]
fn overrides_win_over_files() {
    let path = scratch_file("override", "[logging]\nfilter = \"info\"\n");
    let settings = Loader::new()
        .without_environment()
        .with_file(&path)
        .set_override("logging.filter", "debug")
        .expect("override")
        .build()
        .expect("settings");
    fs::remove_file(&path).ok();
    assert_eq!(settings.logging.filter, "debug");
}

#[test]
fn settings_drive_compiler_and_generator() {
    let settings = load_defaults().expect("defaults");
    let compiler = Compiler::new(Vocabulary::from_settings(&settings.metatags));
    let program = compiler.compile("views:10-20").unwrap().into_program().unwrap();
    let document = Generator::new(&settings.generator).generate_to_string(&program).unwrap();
    assert!(document.contains("\n        [ $P$, circle, draw, green\n"));
}

#[test]
fn environment_wins_over_file_and_defaults() {
    let path = scratch_file("environment", "[generator]\nindent_size = 2\n");
    unsafe {
        // SAFETY: every other loader in this binary skips the environment
        // layer, and no other test touches this variable.
        std::env::set_var("TAGQUERY__GENERATOR__INDENT_SIZE", "3");
    }
    let settings = Loader::new().with_file(&path).build();
    unsafe {
        // SAFETY: as above.
        std::env::remove_var("TAGQUERY__GENERATOR__INDENT_SIZE");
    }
    fs::remove_file(&path).ok();

    let settings = settings.expect("settings");
    assert_eq!(settings.generator.indent_size, 3);
    assert_eq!(settings.generator.indent_char, ' ');
    assert_eq!(settings.logging.filter, "warn");
}
