use purifier::{ConfigStore, Purifier, Settings};
use purifier_html::lexer::Lexer;
use purifier_html::token::{Token, TokenKind};

/// Inputs that exercise most repairs the purifier makes
const CORPUS: &[&str] = &[
    "",
    "plain text",
    "<b>Foobar",
    "<i></b></i>",
    "<p>Foo<div>Bar</div>",
    "<b><i>x</b>y</i>",
    "<b>a<div>b</div></b>",
    "<ul><li>a<li>b</ul>text",
    "<ol><li>one</li>stray<li>two</ol>",
    "<dl><dt>term<dd>description</dl>",
    "<table><tr><td>x</td></tr></table>",
    "<table><caption>c</caption><td>loose</td></table>",
    r#"<a href="javascript:alert(1)" onclick="x()">link</a>"#,
    r#"<a href="http://example.com/">a<a href="http://example.org/">nested</a></a>"#,
    r#"<img src="x.png" onerror="alert(1)">"#,
    "<div><span><p>nested</p></span></div>",
    r#"<pre><b><img src="a.png" alt="a" />bold</b></pre>"#,
    "<!-- comment --><script>alert(1)</script><style>p{}</style>after",
    "<blockquote>quote</blockquote>",
    "a < b & c > d &amp;&lt;&copy;&#169;&#xA9;",
    r#"<font color="red">old</font><center>c</center>"#,
    r#"<span style="color: red; width: expression(alert(1))">s</span>"#,
    r#"<p align="center" title='"quoted"'>x</p>"#,
    "<h1>title<h2>sub</h2></h1>",
    "</p></div>unbalanced<div><div>",
    "<br><hr><br/>",
    "<ins><div>block in ins</div></ins><span><ins><div>x</div></ins></span>",
    "<blink><marquee>gone</marquee></blink>",
];

fn purifier(settings: &[(&str, &str)]) -> Purifier {
    let store = ConfigStore::new().unwrap();
    for (key, value) in settings {
        store.set_from_str(key, value).unwrap();
    }
    Purifier::from_store(&store).unwrap()
}

fn lex(html: &str) -> Vec<Token> {
    let settings = Settings::defaults().unwrap();
    Lexer::new(&settings).tokenize(html)
}

#[test]
fn purifying_twice_changes_nothing() {
    for settings in [
        vec![],
        vec![("html.allowed", "p,b,i,a[href],ul,li")],
        vec![("core.escape_invalid_tags", "true")],
    ] {
        let purifier = purifier(&settings);
        for html in CORPUS {
            let once = purifier.purify(html);
            let twice = purifier.purify(&once);
            assert_eq!(once, twice, "input {html:?} with {settings:?}");
        }
    }
}

#[test]
fn purifying_twice_changes_nothing_with_injectors() {
    let cases: &[(&str, &[&str])] = &[
        (
            "autoformat.auto_paragraph",
            &[
                "<p>a</p>b",
                "a<ul><li>x</li></ul>b\n\nc",
                "<b>a<div>b</div></b>",
                "<div>a</div>\n\nb",
                "one\n\ntwo",
            ],
        ),
        (
            "autoformat.remove_empty",
            &[
                "<b>a<div>b</div></b>",
                "<span><div>a</div></span>",
                "<b><i>x</b>y",
                "<p><b></b></p>z",
                "<b>x</b><i> ",
            ],
        ),
    ];

    for (setting, inputs) in cases {
        let purifier = purifier(&[(setting, "true")]);
        for html in *inputs {
            let once = purifier.purify(html);
            let twice = purifier.purify(&once);
            assert_eq!(once, twice, "input {html:?} with {setting}");
        }
    }
}

#[test]
fn output_only_holds_allowed_elements_and_attributes() {
    let purifier = purifier(&[("html.allowed", "p,b,i,a[href|title],ul,li")]);
    let elements = ["p", "b", "i", "a", "ul", "li"];
    let attributes = ["href", "title"];

    for html in CORPUS {
        for token in lex(&purifier.purify(html)) {
            if let Some(name) = token.tag_name() {
                assert!(elements.contains(&name), "{name} in output of {html:?}");
            }
            for key in token.attrs().into_iter().flat_map(|attrs| attrs.keys()) {
                assert!(attributes.contains(&key.as_str()), "{key} in output of {html:?}");
            }
        }
    }
}

#[test]
fn output_is_balanced() {
    let purifier = purifier(&[]);

    for html in CORPUS {
        let mut open: Vec<String> = vec![];
        for token in lex(&purifier.purify(html)) {
            match &token.kind {
                TokenKind::Start { name, .. } => open.push(name.clone()),
                TokenKind::End { name, .. } => {
                    assert_eq!(open.pop().as_ref(), Some(name), "unbalanced output of {html:?}");
                }
                _ => {}
            }
        }
        assert!(open.is_empty(), "unclosed {open:?} in output of {html:?}");
    }
}

#[test]
fn excluded_elements_never_appear_below_their_ancestor() {
    let purifier = purifier(&[]);
    // element -> elements excluded anywhere below it
    let exclusions: &[(&str, &[&str])] = &[
        ("a", &["a"]),
        ("pre", &["img", "big", "small", "object", "applet", "font", "basefont", "sub", "sup"]),
    ];

    for html in CORPUS {
        let mut open: Vec<String> = vec![];
        for token in lex(&purifier.purify(html)) {
            if let Some(name) = token.tag_name() {
                if token.is_start() || token.is_empty_tag() {
                    for (ancestor, excluded) in exclusions {
                        assert!(
                            !(open.iter().any(|o| o == ancestor) && excluded.contains(&name)),
                            "{name} inside {ancestor} in output of {html:?}"
                        );
                    }
                }
                if token.is_start() {
                    open.push(name.to_string());
                } else if token.is_end() {
                    open.pop();
                }
            }
        }
    }
}

#[test]
fn content_models_hold_in_output() {
    let purifier = purifier(&[]);

    for html in CORPUS {
        let mut open: Vec<String> = vec![];
        for token in lex(&purifier.purify(html)) {
            let parent = open.last().map(String::as_str);
            match parent {
                Some("ul" | "ol") if token.is_start() || token.is_text() => {
                    assert!(
                        token.is_start_of("li") || token.is_whitespace(),
                        "{token} directly inside a list in output of {html:?}"
                    );
                }
                Some("tr") if token.is_start() => {
                    assert!(token.is_start_of("td") || token.is_start_of("th"));
                }
                _ => {}
            }
            if token.is_start() {
                open.push(token.tag_name().unwrap_or_default().to_string());
            } else if token.is_end() {
                open.pop();
            }
        }
    }
}
