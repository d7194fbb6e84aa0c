use tagquery::settings::GeneratorSettings;
use tagquery::{Generator, compile};

fn document(query: &str) -> String {
    let program = compile(query).expect("query to parse").into_program().expect("program");
    Generator::default().generate_to_string(&program).expect("document")
}

fn bracket_lines<'a>(document: &'a str) -> Vec<&'a str> {
    let start = document.find("\\begin{forest}\n").expect("forest start") + "\\begin{forest}\n".len();
    let end = document.find("    \\end{forest}").expect("forest end");
    document[start..end].lines().collect()
}

#[test]
fn wraps_tree_in_standalone_document() {
    let document = document("cat");
    assert!(document.starts_with("\\documentclass{standalone}\n\n\\usepackage[utf8]{inputenc}\n"));
    assert!(document.contains("\\usepackage{forest}\n"));
    assert!(document.contains("\\begin{document}\n    \\centering\n    \\begin{forest}\n"));
    assert!(document.ends_with("    \\end{forest}\n\\end{document}\n\n"));
}

#[test]
fn emits_the_same_document_twice() {
    let query = "(cat OR dog) AS pets pets AND NOT title:\"a_b\" ORDER BY views";
    let program = compile(query).unwrap().into_program().unwrap();
    let generator = Generator::default();
    let first = generator.generate_to_string(&program).unwrap();
    let second = generator.generate_to_string(&program).unwrap();
    assert_eq!(first, second);
}

#[test]
fn nesting_follows_tree_depth() {
    let document = document("red_panda AND NOT blue");
    let lines = bracket_lines(&document);
    let mut depth = 0usize;
    for line in &lines {
        let indent = line.len() - line.trim_start().len();
        assert_eq!(indent % 4, 0, "line {:?}", line);
        let level = indent / 4;
        let trimmed = line.trim_start();
        if trimmed == "]" {
            depth -= 1;
            assert_eq!(level, depth + 2, "closing bracket level");
        } else {
            assert_eq!(level, depth + 2, "line {:?}", line);
            if !trimmed.ends_with(']') {
                depth += 1;
            }
        }
    }
    assert_eq!(depth, 0);
    let opening: usize = lines.iter().map(|l| l.matches('[').count()).sum();
    let closing: usize = lines.iter().map(|l| l.matches(']').count()).sum();
    assert_eq!(opening, closing);
}

#[test]
fn program_starts_at_level_two() {
    let document = document("cat");
    let lines = bracket_lines(&document);
    assert_eq!(lines[0], "        [ $P$, circle, draw, green");
    assert_eq!(lines[1], "            [ $Q$, circle, draw, red");
    assert_eq!(lines.last().copied(), Some("        ]"));
}

#[test]
fn renders_tag_string_leaves() {
    let document = document("red_panda*");
    assert!(document.contains("[ $T$, circle, draw, cyan"));
    assert!(document.contains("[ $STR$, circle, draw, teal"));
    assert!(document.contains("[ $Pattern$, circle, draw, black!20]"));
    assert!(document.contains("[ ${red\\_panda*}$, draw, black]"));
}

#[test]
fn renders_operators_and_parentheses() {
    let document = document("NOT (a OR b) AND c");
    assert!(document.contains("[ $!$, circle, draw, purple ]"));
    assert!(document.contains("[ $($, circle, draw, purple ]"));
    assert!(document.contains("[ $|$, circle, draw, purple ]"));
    assert!(document.contains("[ $)$, circle, draw, purple ]"));
    assert!(document.contains("[ $+$, circle, draw, purple ]"));
}

#[test]
fn renders_scalar_shapes() {
    let ranged = document("size:100-200");
    assert!(ranged.contains("[ $SZ$, circle, draw, black!20"));
    assert!(ranged.contains("[ ${100}$, draw, black]\n"));
    assert!(ranged.contains("[ ${200}$, draw, black]\n"));
    assert!(!ranged.contains("${=}$"));

    let quantified = document("likes:>=10");
    assert!(quantified.contains("[ $I$, circle, draw, black!20"));
    assert!(quantified.contains("[ ${10}$, draw, black]\n"));
    assert!(quantified.contains("[ ${>=}$, draw, black]\n"));

    let bare = document("date:2020-01-01");
    assert!(bare.contains("[ $D$, circle, draw, black!20"));
    assert!(bare.contains("[ ${=}$, draw, black]\n"));
}

#[test]
fn renders_metatag_name_before_value() {
    let document = document("title:\"Red Panda\"");
    let name = document.find("[ ${title}$, draw, black]").expect("name leaf");
    let value = document.find("[ ${Red Panda}$, draw, black]").expect("value leaf");
    assert!(name < value);
    assert!(document.contains("[ $M$, circle, draw, brown"));
    assert!(document.contains("[ $Exact$, circle, draw, black!20]"));
}

#[test]
fn renders_order_and_subqueries() {
    let document = document("(cat OR dog) AS pets pets ORDER BY likes DESC");
    assert!(document.contains("[ $S$, circle, draw, orange"));
    assert!(document.contains("[ $sub$, circle, draw, magenta"));
    assert!(document.contains("[ $N$, circle, draw, magenta"));
    assert!(document.contains("[ $O$, circle, draw, magenta"));
    assert!(document.contains("[ ${LIKES}$, draw, black]"));
    assert!(document.contains("[ ${DESC}$, draw, black]"));
}

#[test]
fn subqueries_nest_in_declaration_order() {
    let document = document("a AS first b AS second c AS third x");
    let first = document.find("{first}").unwrap();
    let second = document.find("{second}").unwrap();
    let third = document.find("{third}").unwrap();
    assert!(first < second && second < third);
    assert_eq!(document.matches("[ $S$, circle, draw, orange").count(), 3);
}

#[test]
fn custom_indentation() {
    let settings = GeneratorSettings { indent_char: ' ', indent_size: 2 };
    let program = compile("cat").unwrap().into_program().unwrap();
    let document = Generator::new(&settings).generate_to_string(&program).unwrap();
    assert!(document.contains("\n    [ $P$, circle, draw, green\n      [ $Q$, circle, draw, red\n"));
}

#[test]
fn writes_into_any_writer() {
    let program = compile("cat").unwrap().into_program().unwrap();
    let mut buffer: Vec<u8> = Vec::new();
    Generator::default().generate(&program, &mut buffer).unwrap();
    assert_eq!(String::from_utf8(buffer).unwrap(), Generator::default().generate_to_string(&program).unwrap());
}

#[test]
fn brackets_inside_values_keep_document_balanced() {
    for query in ["a]b", "[x", "title:\"[draft]\" AND c[1]"] {
        let document = document(query);
        let lines = bracket_lines(&document);
        let opening: usize = lines.iter().map(|l| l.matches('[').count()).sum();
        let closing: usize = lines.iter().map(|l| l.matches(']').count()).sum();
        assert_eq!(opening, closing, "query {:?}", query);
    }
    assert!(document("a]b").contains("[ ${a\\rbrack{}b}$, draw, black]"));
}
