use logos::Logos;
use rstest::rstest;
use serde_json::json;
use tabula::{
    Action, Actions, Lexer, ParseError, ParseErrorKind, ParseTables, ParserOptions, Position,
    Reduction, Span, TokenRef, WordLexer,
};
use tabula_gen::{Algorithm, Generator, GeneratorOptions, GrammarSpec, LrGenerator};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r]+")]
enum Tok {
    #[token("\n")]
    Newline,
    #[regex(r"[0-9]+")]
    Number,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Word,
    #[regex(r"[-+*/<;()]")]
    Punct,
}

/// Numbers become `NUMBER`; every other token is named by its text.
#[derive(Default)]
struct CalcLexer {
    input: String,
    offset: usize,
    start: usize,
    end: usize,
    line: usize,
    line_start: usize,
}

impl CalcLexer {
    fn position(&self, offset: usize) -> Position {
        Position::new(self.line, offset - self.line_start)
    }
}

impl Lexer for CalcLexer {
    fn set_input(&mut self, input: &str) {
        *self = CalcLexer {
            input: input.to_owned(),
            ..Default::default()
        };
    }

    fn lex(&mut self) -> Result<Option<TokenRef>, ParseError> {
        loop {
            let mut lexer = Tok::lexer(&self.input[self.offset..]);
            let Some(token) = lexer.next() else {
                self.start = self.input.len();
                self.end = self.input.len();
                return Ok(None);
            };
            let span = lexer.span();
            self.start = self.offset + span.start;
            self.end = self.offset + span.end;
            self.offset = self.end;
            match token {
                Ok(Tok::Newline) => {
                    self.line += 1;
                    self.line_start = self.end;
                }
                Ok(Tok::Number) => return Ok(Some(TokenRef::from("NUMBER"))),
                Ok(Tok::Word | Tok::Punct) => return Ok(Some(TokenRef::from(self.text()))),
                Err(()) => {
                    return Err(ParseError::lexical(
                        &format!("unrecognized text '{}'", self.text()),
                        Some(self.location()),
                    ));
                }
            }
        }
    }

    fn text(&self) -> &str {
        &self.input[self.start..self.end]
    }

    fn line_number(&self) -> usize {
        self.line
    }

    fn location(&self) -> Span {
        Span::new(self.position(self.start), self.position(self.end))
            .with_range(self.start, self.end)
    }

    fn ranges(&self) -> bool {
        true
    }
}

/// Evaluates `e -> e + e | e * e | ( e ) | NUMBER`.
struct Calc {
    ops: Vec<(usize, fn(i64, i64) -> i64)>,
}

impl Calc {
    fn arith() -> Self {
        Self {
            ops: vec![(1, |a, b| a + b), (2, |a, b| a * b)],
        }
    }
}

impl Actions for Calc {
    type Value = i64;

    fn shift_value(&mut self, text: &str) -> i64 {
        text.parse().unwrap_or_default()
    }

    fn reduce(&mut self, production: usize, r: &mut Reduction<'_, i64>) -> Result<(), ParseError> {
        if let Some((_, op)) = self.ops.iter().find(|(p, _)| *p == production) {
            let (Some(&a), Some(&b)) = (r.value(1), r.value(3)) else {
                return Err(ParseError::action("binary operator needs two operands"));
            };
            r.value = op(a, b);
        } else if r.arity() == 3 {
            r.value = r.value(2).copied().unwrap_or_default();
        }
        Ok(())
    }
}

/// Builds a bracketed rendering of the parse and records reductions.
#[derive(Default)]
struct Recorder {
    reductions: Vec<usize>,
    errors: Vec<String>,
    pick_last: bool,
}

impl Actions for Recorder {
    type Value = String;

    fn shift_value(&mut self, text: &str) -> String {
        text.to_owned()
    }

    fn reduce(&mut self, production: usize, r: &mut Reduction<'_, String>) -> Result<(), ParseError> {
        self.reductions.push(production);
        if r.arity() > 1 {
            r.value = format!("({})", r.values.join(" "));
        }
        Ok(())
    }

    fn parse_error(&mut self, error: &ParseError) -> Result<(), ParseError> {
        self.errors.push(error.message.to_string());
        if error.recoverable {
            Ok(())
        } else {
            Err(error.clone())
        }
    }

    fn resolve_ambiguity(
        &mut self,
        _state: usize,
        _token: usize,
        candidates: &[Action],
    ) -> Result<Action, ParseError> {
        if self.pick_last {
            candidates
                .last()
                .copied()
                .ok_or_else(|| ParseError::internal("empty ambiguity"))
        } else {
            Err(ParseError::internal("ambiguous"))
        }
    }
}

fn lr(spec: &GrammarSpec, algorithm: Algorithm) -> LrGenerator {
    init_logger();
    let options = GeneratorOptions {
        algorithm,
        ..Default::default()
    };
    LrGenerator::new(spec, options).unwrap()
}

fn spec(value: serde_json::Value) -> GrammarSpec {
    serde_json::from_value(value).unwrap()
}

fn expression_grammar() -> GrammarSpec {
    spec(json!({"bnf": {"E": "E + T | T", "T": "NUMBER"}}))
}

fn arith_grammar() -> GrammarSpec {
    spec(json!({
        "operators": [["left", "+"], ["left", "*"]],
        "bnf": {"e": "e + e | e * e | ( e ) | NUMBER"}
    }))
}

#[rstest]
#[case::lr0(Algorithm::Lr0)]
#[case::slr(Algorithm::Slr)]
#[case::lalr(Algorithm::Lalr)]
#[case::lr1(Algorithm::Lr)]
fn sums_reduce_left_associatively(#[case] algorithm: Algorithm) {
    let generator = lr(&expression_grammar(), algorithm);
    assert_eq!(generator.conflicts(), 0);
    let mut parser = generator.create_parser(CalcLexer::default(), Recorder::default());
    let tree = parser.parse("1 + 2 + 3").unwrap();
    assert_eq!(tree, "((1 + 2) + 3)");
    let actions = parser.into_actions();
    assert_eq!(actions.reductions, [3, 2, 3, 1, 3, 1]);
    assert!(actions.errors.is_empty());
}

#[rstest]
#[case::lr0(Algorithm::Lr0)]
#[case::slr(Algorithm::Slr)]
#[case::lalr(Algorithm::Lalr)]
#[case::lr1(Algorithm::Lr)]
fn precedence_orders_operators(#[case] algorithm: Algorithm) {
    let generator = lr(&arith_grammar(), algorithm);
    assert_eq!(generator.conflicts(), 0);
    let mut parser = generator.create_parser(CalcLexer::default(), Calc::arith());
    assert_eq!(parser.parse("1 + 2 * 3").unwrap(), 7);
    assert_eq!(parser.parse("2 * 3 + 4").unwrap(), 10);
    assert_eq!(parser.parse("1 + 2 + 3 * 4 * 5").unwrap(), 63);
    assert_eq!(parser.parse("(1 + 2) * 3").unwrap(), 9);
}

#[rstest]
#[case::slr(Algorithm::Slr)]
#[case::lalr(Algorithm::Lalr)]
#[case::lr1(Algorithm::Lr)]
fn nonassoc_operators_do_not_chain(#[case] algorithm: Algorithm) {
    let grammar = spec(json!({
        "operators": [["nonassoc", "<"]],
        "bnf": {"e": "e < e | NUMBER"}
    }));
    let generator = lr(&grammar, algorithm);
    assert_eq!(generator.conflicts(), 0);
    let mut parser = generator.create_parser(CalcLexer::default(), Recorder::default());
    assert_eq!(parser.parse("1 < 2").unwrap(), "(1 < 2)");
    let err = parser.parse("1 < 2 < 3").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Syntax);
    assert!(!err.recoverable);
    assert_eq!(err.token.as_deref(), Some("<"));
}

#[test]
fn reduce_reduce_picks_first_production() {
    let grammar = spec(json!({"bnf": {"S": "a | a"}}));
    let generator = lr(&grammar, Algorithm::Lalr);
    assert_eq!(generator.conflicts(), 1);
    let resolution = &generator.resolutions()[0];
    assert!(resolution.solution.by_default);
    assert_eq!(resolution.solution.action, Some(Action::Reduce(1)));
    let mut parser = generator.create_parser(WordLexer::new(), Recorder::default());
    parser.parse("a").unwrap();
    assert_eq!(parser.actions().reductions, [1]);
}

#[test]
fn unresolved_ambiguity_is_delegated() {
    let grammar = spec(json!({"bnf": {"S": "a | a"}}));
    let options = GeneratorOptions {
        no_default_resolve: true,
        ..Default::default()
    };
    let generator = LrGenerator::new(&grammar, options).unwrap();
    assert_eq!(generator.tables().ambigs.len(), 1);

    let mut parser = generator.create_parser(WordLexer::new(), Recorder::default());
    let err = parser.parse("a").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::InternalInvariant);

    let picker = Recorder {
        pick_last: true,
        ..Default::default()
    };
    let mut parser = generator.create_parser(WordLexer::new(), picker);
    parser.parse("a").unwrap();
    assert_eq!(parser.actions().reductions, [2]);
    assert_eq!(parser.stats().ambigs, 1);
}

fn statements() -> GrammarSpec {
    spec(json!({
        "bnf": {
            "list": "list stmt | stmt",
            "stmt": "NUMBER ; | error ;"
        }
    }))
}

#[rstest]
#[case::slr(Algorithm::Slr)]
#[case::lalr(Algorithm::Lalr)]
#[case::lr1(Algorithm::Lr)]
fn error_production_resynchronizes(#[case] algorithm: Algorithm) {
    let generator = lr(&statements(), algorithm);
    assert!(generator.grammar().has_error_recovery());
    let mut parser = generator.create_parser(CalcLexer::default(), Recorder::default());
    parser.parse("1 ; 2 oops ; 3 ;").unwrap();
    assert_eq!(parser.stats().recoveries, 1);
    let errors = &parser.actions().errors;
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("'oops'"), "{}", errors[0]);
}

#[rstest]
#[case::slr(Algorithm::Slr)]
#[case::lalr(Algorithm::Lalr)]
#[case::lr1(Algorithm::Lr)]
fn adjacent_bad_tokens_are_fatal(#[case] algorithm: Algorithm) {
    let generator = lr(&statements(), algorithm);
    let mut parser = generator.create_parser(CalcLexer::default(), Recorder::default());
    let err = parser.parse("1 ; 2 oops oops ; 3 ;").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Syntax);
    assert!(
        err.message
            .starts_with("Parsing halted while starting to recover from another error.")
    );
    assert!(parser.parse("1 ; 2 ;").is_ok());
}

#[rstest]
#[case::slr(Algorithm::Slr)]
#[case::lalr(Algorithm::Lalr)]
#[case::lr1(Algorithm::Lr)]
fn error_soon_after_recovery_recovers_quietly(#[case] algorithm: Algorithm) {
    let generator = lr(&statements(), algorithm);
    let mut parser = generator.create_parser(CalcLexer::default(), Recorder::default());
    let value = parser.parse("1 ; oops ; bad ;").unwrap();
    assert_eq!(value, "(((1 ;) (oops ;)) (bad ;))");
    assert_eq!(parser.stats().recoveries, 2);
    let errors = &parser.actions().errors;
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("'oops'"), "{}", errors[0]);
}

#[test]
fn recovery_window_decides_what_is_reported() {
    let generator = lr(&statements(), Algorithm::Lalr);
    let input = "oops ; bad ;";

    let mut parser = generator.create_parser(CalcLexer::default(), Recorder::default());
    parser.parse(input).unwrap();
    assert_eq!(parser.actions().errors.len(), 1);

    let mut parser = generator
        .create_parser(CalcLexer::default(), Recorder::default())
        .with_options(ParserOptions { recovery_shifts: 1 });
    parser.parse(input).unwrap();
    let errors = &parser.actions().errors;
    assert_eq!(errors.len(), 2);
    assert!(errors[1].contains("'bad'"), "{}", errors[1]);
}

#[test]
fn nonterminal_names_from_the_lexer_are_syntax_errors() {
    let generator = lr(&expression_grammar(), Algorithm::Lalr);
    let mut parser = generator.create_parser(CalcLexer::default(), Recorder::default());
    let err = parser.parse("1 + T").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Syntax);
    assert_eq!(err.token.as_deref(), Some("T"));
    assert_eq!(parser.actions().errors.len(), 1);
}

#[test]
fn error_at_end_of_input_is_fatal() {
    let generator = lr(&statements(), Algorithm::Lalr);
    let mut parser = generator.create_parser(CalcLexer::default(), Recorder::default());
    let err = parser.parse("1 ; 2").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Syntax);
    assert_eq!(err.token.as_deref(), Some("$end"));
}

#[rstest]
#[case::lr0(Algorithm::Lr0)]
#[case::slr(Algorithm::Slr)]
#[case::lalr(Algorithm::Lalr)]
#[case::lr1(Algorithm::Lr)]
fn epsilon_recursion(#[case] algorithm: Algorithm) {
    let generator = lr(&GrammarSpec::new().rule("A", "A x | "), algorithm);
    assert_eq!(generator.conflicts(), 0);
    let mut parser = generator.create_parser(WordLexer::new(), Recorder::default());
    assert_eq!(parser.parse("x x x").unwrap(), "((( x) x) x)");
    assert_eq!(parser.actions().reductions, [2, 1, 1, 1]);
    assert!(parser.parse("").is_ok());
}

fn lr1_not_lalr() -> GrammarSpec {
    GrammarSpec::new()
        .rule("S", "a A d | b B d | a B e | b A e")
        .rule("A", "c")
        .rule("B", "c")
}

#[test]
fn canonical_lr1_separates_what_lalr_merges() {
    let lr1 = lr(&lr1_not_lalr(), Algorithm::Lr);
    assert_eq!(lr1.conflicts(), 0);
    let lalr = lr(&lr1_not_lalr(), Algorithm::Lalr);
    assert_eq!(lalr.conflicts(), 2);
    assert!(lalr.resolutions().iter().all(|r| r.solution.by_default));
    assert!(lr1.states().len() > lalr.states().len());

    let mut parser = lr1.create_parser(WordLexer::new(), Recorder::default());
    for input in ["a c d", "b c d", "a c e", "b c e"] {
        assert!(parser.parse(input).is_ok(), "{}", input);
    }
    let mut parser = lalr.create_parser(WordLexer::new(), Recorder::default());
    assert!(parser.parse("a c d").is_ok());
    assert!(parser.parse("a c e").is_err());
}

#[test]
fn compilers_grammar_has_one_lr1_conflict() {
    let grammar = GrammarSpec::new()
        .rule("n", "a b")
        .rule("a", " | a x")
        .rule("b", " | b x y");
    assert_eq!(lr(&grammar, Algorithm::Lr).conflicts(), 1);
}

#[test]
fn on_demand_lookahead_parses_the_same() {
    let full = lr(&arith_grammar(), Algorithm::Lalr);
    let options = GeneratorOptions {
        on_demand_lookahead: true,
        ..Default::default()
    };
    let on_demand = LrGenerator::new(&arith_grammar(), options).unwrap();
    assert_eq!(on_demand.conflicts(), 0);
    assert_eq!(on_demand.states().len(), full.states().len());
    let mut a = full.create_parser(CalcLexer::default(), Calc::arith());
    let mut b = on_demand.create_parser(CalcLexer::default(), Calc::arith());
    for input in ["1", "1 + 2 * 3", "(4 + 4) * 2 + 1"] {
        assert_eq!(a.parse(input).unwrap(), b.parse(input).unwrap());
    }
    assert!(b.parse("1 + * 2").is_err());
}

#[test]
fn debug_tracing_does_not_change_tables() {
    let plain = lr(&arith_grammar(), Algorithm::Lr);
    let options = GeneratorOptions {
        algorithm: Algorithm::Lr,
        debug: true,
        ..Default::default()
    };
    let traced = LrGenerator::new(&arith_grammar(), options).unwrap();
    assert_eq!(plain.tables(), traced.tables());
}

#[test]
fn tables_survive_json_round_trip() {
    let generator = lr(&arith_grammar(), Algorithm::Lalr);
    let json = generator.tables().to_json().unwrap();
    let reloaded = ParseTables::from_json(&json).unwrap();
    assert_eq!(&reloaded, generator.tables().as_ref());

    let mut parser = generator.create_parser(CalcLexer::default(), Calc::arith());
    let before = parser.parse("2 * (3 + 4)").unwrap();
    parser.init(reloaded);
    assert_eq!(parser.parse("2 * (3 + 4)").unwrap(), before);
    assert_eq!(before, 14);
}

#[test]
fn lexical_errors_abort_the_parse() {
    let generator = lr(&arith_grammar(), Algorithm::Lalr);
    let mut parser = generator.create_parser(CalcLexer::default(), Calc::arith());
    let err = parser.parse("1 + #").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Lexical);
    assert_eq!(err.span.and_then(|s| s.range), Some((4, 5)));
}

#[test]
fn locations_follow_lines() {
    let generator = lr(&arith_grammar(), Algorithm::Lalr);
    let mut parser = generator.create_parser(CalcLexer::default(), Calc::arith());
    let err = parser.parse("1 +\n2 *\n3 3").unwrap_err();
    assert!(!err.recoverable);
    assert_eq!(err.line, 2);
    assert_eq!(err.span.map(|s| s.start), Some(Position::new(2, 2)));
    assert!(err.message.starts_with("Parse error on line 3"), "{}", err.message);

    let err = parser.parse("1 +\n2\n3").unwrap_err();
    assert_eq!(err.line, 1);
    assert_eq!(err.span.map(|s| s.start), Some(Position::new(2, 0)));
    assert!(err.message.starts_with("Parse error on line 2"), "{}", err.message);
}

#[test]
fn ll1_tables_from_options() {
    let grammar = spec(json!({
        "bnf": {"E": "T Ep", "Ep": "+ T Ep | ", "T": "NUMBER"},
        "options": {"type": "ll"}
    }));
    let generator = Generator::from_spec(&grammar).unwrap();
    assert_eq!(generator.name(), "LL(1)");
    assert_eq!(generator.conflicts(), 0);
    let Generator::Ll(ll) = &generator else {
        panic!("expected an LL(1) generator");
    };
    let ep = generator.grammar().symbol_id("Ep").unwrap();
    assert_eq!(ll.table().predict(ep, tabula::END), &[3]);
}
