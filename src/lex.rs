//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del compilador. Descompone un [`InputStream`]
//! (flujo de caracteres) en unidades léxicas denominadas tokens. Los espacios
//! en blanco y los comentarios se descartan durante esta operación. Cada
//! token emitido esta asociado a una ubicación en el código fuente original,
//! lo cual permite rastrear errores tanto en los tokens mismos como en
//! constructos de fases posteriores.
//!
//! # Comentarios
//! Existen tres formas: `// hasta fin de línea`, `/* bloque */` y
//! `/** documentación */`. Los comentarios de bloque pueden abarcar varias
//! líneas. El contenido de una constante de cadena nunca se interpreta como
//! comentario, aunque contenga `//` o `/*`.
//!
//! # Contenido de un token
//! Palabras clave y símbolos se identifican por lo que son y no incluyen
//! lexemas. Los identificadores sí incluyen su lexema original. Las
//! constantes enteras se resuelven a su valor, el cual debe encontrarse
//! en `[0, 32767]`, y las constantes de cadena conservan su contenido
//! sin las comillas delimitadoras.
//!
//! # Errores
//! El lexer es capaz de recuperarse parcialmente de condiciones de error.
//! Esto ocurre en suficiente grado como para reportar más de un error por
//! ejecución, pero no lo suficiente como para permitir el avance a las
//! demás fases de la compilación.

use crate::source::{InputStream, Located, Location};
use std::{
    fmt::{self, Display},
    io::{self, Write},
    rc::Rc,
    str::FromStr,
};

use log::trace;
use thiserror::Error;

/// Literal entero máximo.
pub const INT_MAX: u16 = 32767;

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LexerError {
    /// Error de E/S originado por el [`InputStream`].
    #[error("I/O error")]
    Input(#[from] std::io::Error),

    /// Carácter desconocido o inesperado en el flujo de entrada.
    #[error("Bad character {0:?} in input stream")]
    BadChar(char),

    /// Una constante entera se encuentra fuera de rango.
    #[error("Integer literal overflow, valid range is [0, {INT_MAX}]")]
    IntOverflow,

    /// Una constante de cadena excede la longitud máxima.
    #[error("String literal too long, maximum length is {INT_MAX}")]
    StringOverflow,

    /// Una constante de cadena no se cerró antes del fin de línea.
    #[error("Unterminated string literal")]
    UnterminatedString,

    /// Un comentario de bloque no se cerró antes del fin de archivo.
    #[error("Unterminated block comment, expected `*/`")]
    UnterminatedComment,
}

/// Un identificador.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(Rc<str>);

impl Identifier {
    /// Construye un identificador a partir de su lexema.
    pub fn new(name: &str) -> Self {
        Identifier(Rc::from(name))
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Display for Identifier {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(&self.0)
    }
}

/// Objeto resultante del análisis léxico.
///
/// Un token contiene suficiente información para describir completamente
/// a una entidad léxica en el programa fuente.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Palabra clave.
    Keyword(Keyword),

    /// Puntuación u operador.
    Symbol(Symbol),

    /// Identificador.
    Id(Identifier),

    /// Constante entera.
    IntConst(u16),

    /// Constante de cadena, sin comillas.
    StringConst(Rc<str>),
}

impl Token {
    /// Categoría léxica del token.
    pub fn token_type(&self) -> TokenType {
        match self {
            Token::Keyword(_) => TokenType::Keyword,
            Token::Symbol(_) => TokenType::Symbol,
            Token::Id(_) => TokenType::Identifier,
            Token::IntConst(_) => TokenType::IntConst,
            Token::StringConst(_) => TokenType::StringConst,
        }
    }
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Keyword(keyword) => write!(fmt, "keyword `{}`", keyword),
            Token::Symbol(symbol) => write!(fmt, "`{}`", symbol),
            Token::Id(id) => write!(fmt, "identifier `{}`", id),
            Token::IntConst(integer) => write!(fmt, "literal `{}`", integer),
            Token::StringConst(string) => write!(fmt, "string literal {:?}", string),
        }
    }
}

/// Categoría léxica de un token.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenType {
    Keyword,
    Symbol,
    Identifier,
    IntConst,
    StringConst,
}

impl TokenType {
    /// Nombre de elemento en listados XML de tokens.
    fn tag(self) -> &'static str {
        match self {
            TokenType::Keyword => "keyword",
            TokenType::Symbol => "symbol",
            TokenType::Identifier => "identifier",
            TokenType::IntConst => "integerConstant",
            TokenType::StringConst => "stringConstant",
        }
    }
}

/// Una palabra clave.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    Class,
    Constructor,
    Function,
    Method,
    Field,
    Static,
    Var,
    Int,
    Char,
    Boolean,
    Void,
    True,
    False,
    Null,
    This,
    Let,
    Do,
    If,
    Else,
    While,
    Return,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("class",       Keyword::Class),
    ("constructor", Keyword::Constructor),
    ("function",    Keyword::Function),
    ("method",      Keyword::Method),
    ("field",       Keyword::Field),
    ("static",      Keyword::Static),
    ("var",         Keyword::Var),
    ("int",         Keyword::Int),
    ("char",        Keyword::Char),
    ("boolean",     Keyword::Boolean),
    ("void",        Keyword::Void),
    ("true",        Keyword::True),
    ("false",       Keyword::False),
    ("null",        Keyword::Null),
    ("this",        Keyword::This),
    ("let",         Keyword::Let),
    ("do",          Keyword::Do),
    ("if",          Keyword::If),
    ("else",        Keyword::Else),
    ("while",       Keyword::While),
    ("return",      Keyword::Return),
];

impl Display for Keyword {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = KEYWORDS
            .iter()
            .find(|&&(_, keyword)| keyword == *self)
            .map(|&(name, _)| name)
            .unwrap_or("?");

        fmt.write_str(string)
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        KEYWORDS
            .iter()
            .find(|&&(name, _)| name == string)
            .map(|&(_, keyword)| keyword)
            .ok_or(())
    }
}

/// Un símbolo de puntuación u operador.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Symbol {
    /// `{`
    OpenCurly,

    /// `}`
    CloseCurly,

    /// `(`
    OpenParen,

    /// `)`
    CloseParen,

    /// `[`
    OpenSquare,

    /// `]`
    CloseSquare,

    /// `.`
    Period,

    /// `,`
    Comma,

    /// `;`
    Semicolon,

    /// `+`
    Plus,

    /// `-`
    Minus,

    /// `*`
    Times,

    /// `/`
    Slash,

    /// `&`
    Ampersand,

    /// `|`
    Pipe,

    /// `<`
    Less,

    /// `>`
    Greater,

    /// `=`
    Equal,

    /// `~`
    Tilde,

    /// `#`
    Hash,

    /// `^`
    Caret,
}

impl Symbol {
    /// Carácter que representa a este símbolo.
    pub fn as_char(self) -> char {
        use Symbol::*;

        match self {
            OpenCurly   => '{',
            CloseCurly  => '}',
            OpenParen   => '(',
            CloseParen  => ')',
            OpenSquare  => '[',
            CloseSquare => ']',
            Period      => '.',
            Comma       => ',',
            Semicolon   => ';',
            Plus        => '+',
            Minus       => '-',
            Times       => '*',
            Slash       => '/',
            Ampersand   => '&',
            Pipe        => '|',
            Less        => '<',
            Greater     => '>',
            Equal       => '=',
            Tilde       => '~',
            Hash        => '#',
            Caret       => '^',
        }
    }

    /// Símbolo de un solo carácter, si existe.
    ///
    /// `/` no se resuelve aquí, ya que puede iniciar un comentario.
    fn from_char(c: char) -> Option<Symbol> {
        use Symbol::*;

        let symbol = match c {
            '{' => OpenCurly,
            '}' => CloseCurly,
            '(' => OpenParen,
            ')' => CloseParen,
            '[' => OpenSquare,
            ']' => CloseSquare,
            '.' => Period,
            ',' => Comma,
            ';' => Semicolon,
            '+' => Plus,
            '-' => Minus,
            '*' => Times,
            '&' => Ampersand,
            '|' => Pipe,
            '<' => Less,
            '>' => Greater,
            '=' => Equal,
            '~' => Tilde,
            '#' => Hash,
            '^' => Caret,
            _ => return None,
        };

        Some(symbol)
    }
}

impl Display for Symbol {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}", self.as_char())
    }
}

/// Máquina de estados para análisis léxico.
///
/// Un lexer puede encontrarse en uno de diversos estados. La
/// salida del lexer, así como su siguiente estado, se define
/// a partir de tanto su estado actual como el siguiente carácter
/// encontrado en el flujo de entrada.
pub struct Lexer<S: Iterator> {
    source: std::iter::Peekable<S>,
    state: State,
    start: Location,
    next: Location,
}

/// Posibles estados del lexer.
enum State {
    /// Estado que ocurre antes de encontrar el inicio de un token.
    Start,

    /// Estado de error.
    Error,

    /// Estado de completitud; siempre emite el token incluido,
    /// consume la entrada actual y pasa a [`State::Start`].
    Complete(Token),

    /// Se encontró `/`.
    ///
    /// Puede tratarse de división o del inicio de un comentario.
    Slash,

    /// Comentario de línea.
    ///
    /// Este estado vuelve a [`State::Start`] al encontrar `'\n'`.
    LineComment,

    /// Comentario de bloque. El booleano indica si el último
    /// carácter visto fue `*`.
    BlockComment(bool),

    /// Constante entera.
    ///
    /// Este estado incluirá dígitos en el token mientras que
    /// el siguiente carácter sea un dígito.
    Integer(u16),

    /// Constante de cadena, sin la comilla inicial.
    String(String),

    /// Término que puede ser un identificador o una palabra clave.
    Word(String),
}

impl<S: InputStream> Lexer<S> {
    /// Crea un lexer en estado inicial a partir de un flujo.
    pub fn new(start: Location, source: S) -> Self {
        let next = start.clone();
        Lexer {
            source: source.peekable(),
            state: State::Start,
            start,
            next,
        }
    }

    /// Reduce la entrada a sea una secuencia conocida de tokens
    /// infalibles o una secuencia de errores.
    ///
    /// En caso de que ocurra al menos un error, el lexer dejará
    /// de buscar tokens exitosos y comenzará a acumular solamente
    /// errores. El propósito de esta función es permitir la
    /// recolección de múltiples errores léxicos en una misma ejecución
    /// del compilador.
    pub fn try_exhaustive(mut self) -> Result<Vec<Located<Token>>, Vec<Located<LexerError>>> {
        let mut tokens = Vec::new();

        while let Some(result) = self.next() {
            match result {
                Ok(token) => tokens.push(token),
                Err(error) => {
                    drop(tokens);

                    let mut errors = vec![error];
                    errors.extend(self.filter_map(Result::err));

                    return Err(errors);
                }
            }
        }

        trace!("Lexed {} tokens", tokens.len());
        Ok(tokens)
    }

    /// Intenta construir un siguiente token.
    fn lex(&mut self) -> Result<Option<(Token, Location)>, LexerError> {
        use State::*;

        let mut last_accepted = self.start.clone();
        let token = loop {
            // Se espera un siguiente carácter, fallando si hay error de E/S
            let next_char = match self.source.peek() {
                None => None,
                Some(Ok((c, _))) => Some(*c),
                Some(Err(_)) => match self.source.next() {
                    Some(Err(error)) => break Err(error.into()),
                    _ => unreachable!(),
                },
            };

            // La posición de origen se mueve junto a la posición
            // siguiente siempre que no se haya encontrado una
            // frontera de token
            if let Start = self.state {
                self.start = self.next.clone();
            }

            // Switch table principal, determina cambios de estado
            // y de salida del lexer a partir de combinaciones del
            // estado actual y el siguiente carácter
            match (&mut self.state, next_char) {
                // Condiciones de error: se descarta la línea donde
                // ocurrió el error. Al llegar al final de la línea
                // el lexer se recupera y reinicia.
                (Error, None) => return Ok(None),
                (Error, Some('\n')) => self.state = Start,
                (Error, Some(_)) => (),

                (Start, None) => return Ok(None),
                (Start, Some('/')) => self.state = Slash,
                (Start, Some('"')) => self.state = String(std::string::String::new()),

                // Identificadores y palabras clave
                (Start, Some(c)) if c.is_ascii_alphabetic() || c == '_' => {
                    self.state = Word(c.to_string())
                }

                // Inicio de una constante numérica. No se consume
                // el dígito, ya que esta lógica ya está implementada
                // en el respectivo caso para un estado de constante
                // entera para el cual el siguiente carácter es un
                // dígito. Por tanto, la constante es inicialmente cero.
                (Start, Some(c)) if c.is_ascii_digit() => {
                    self.state = Integer(0);
                    continue;
                }

                // Espacios en blanco y caracteres inesperados
                (Start, Some(c)) if c.is_whitespace() => (),
                (Start, Some(c)) => match Symbol::from_char(c) {
                    Some(symbol) => self.state = Complete(Token::Symbol(symbol)),
                    None => break Err(LexerError::BadChar(c)),
                },

                // Emisión retardada de tokens cualesquiera
                (Complete(token), _) => {
                    break Ok(std::mem::replace(token, Token::Symbol(Symbol::Plus)))
                }

                // `/` puede iniciar un comentario o ser división, en
                // cuyo caso no se consume el carácter que sigue
                (Slash, Some('/')) => self.state = LineComment,
                (Slash, Some('*')) => self.state = BlockComment(false),
                (Slash, _) => break Ok(Token::Symbol(Symbol::Slash)),

                (LineComment, Some('\n')) => self.state = Start,
                (LineComment, Some(_)) => (),
                (LineComment, None) => self.state = Start,

                // `/**/` cierra inmediatamente, ya que el primer `*`
                // proviene de la apertura y no del cierre
                (BlockComment(true), Some('/')) => self.state = Start,
                (BlockComment(star), Some(c)) => *star = c == '*',
                (BlockComment(_), None) => break Err(LexerError::UnterminatedComment),

                // Acumulación dígito por dígito de constantes enteras
                (Integer(accumulated), Some(digit)) if digit.is_ascii_digit() => {
                    let digit = digit.to_digit(10).unwrap_or(0) as u16;

                    match accumulated
                        .checked_mul(10)
                        .and_then(|n| n.checked_add(digit))
                        .filter(|&n| n <= INT_MAX)
                    {
                        Some(result) => *accumulated = result,
                        None => break Err(LexerError::IntOverflow),
                    }
                }

                // Si sigue algo que no es un dígito, la constante ha terminado
                (Integer(integer), _) => break Ok(Token::IntConst(*integer)),

                // Las cadenas no pueden abarcar más de una línea
                (String(string), Some('"')) => {
                    if string.chars().count() > INT_MAX as usize {
                        break Err(LexerError::StringOverflow);
                    }

                    let string = Rc::from(std::mem::take(string));
                    self.state = Complete(Token::StringConst(string));
                }

                (String(_), Some('\n')) | (String(_), None) => {
                    break Err(LexerError::UnterminatedString)
                }

                // Cada carácter se convierte en una constante, por lo
                // cual debe caber en el mismo rango que los enteros
                (String(_), Some(c)) if c as u32 > INT_MAX as u32 => {
                    break Err(LexerError::BadChar(c))
                }

                (String(string), Some(c)) => string.push(c),

                // Extensión de términos
                (Word(word), Some(c)) if is_word_char(c) => {
                    word.push(c);
                }

                // Si sigue algo que no puede formar parte del término, ha terminado
                (Word(word), _) => match Keyword::from_str(word) {
                    Ok(keyword) => break Ok(Token::Keyword(keyword)),
                    Err(()) => break Ok(Token::Id(Identifier::new(word))),
                },
            }

            // Si no hubo `continue`, aquí se consume el carácter que
            // se observó con lookahead anteriormente
            if let Some(Ok((_, next_position))) = self.source.next() {
                last_accepted = std::mem::replace(&mut self.next, next_position);
            }
        };

        token.map(|token| Some((token, last_accepted)))
    }
}

impl<S: InputStream> Iterator for Lexer<S> {
    type Item = Result<Located<Token>, Located<LexerError>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.lex() {
            Ok(None) => None,
            Ok(Some((token, last_accepted))) => {
                self.state = State::Start;

                let location = Location::span(self.start.clone(), &last_accepted);
                Some(Ok(Located::at(token, location)))
            }

            Err(error) => {
                self.state = State::Error;
                Some(Err(Located::at(error, self.next.clone())))
            }
        }
    }
}

/// Determina si un carácter puede pertenecer a un término.
fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Cursor de avance único sobre una secuencia ya escaneada de tokens.
///
/// Inicialmente no hay un token actual; cada [`Tokens::advance()`]
/// convierte al siguiente token en el actual. Los accesores tipados
/// solo producen un valor cuando el token actual es de su categoría.
pub struct Tokens {
    tokens: Vec<Located<Token>>,
    current: Option<usize>,
}

impl Tokens {
    pub fn new(tokens: Vec<Located<Token>>) -> Self {
        Tokens {
            tokens,
            current: None,
        }
    }

    /// Determina si quedan tokens por avanzar.
    pub fn has_more(&self) -> bool {
        self.next_index() < self.tokens.len()
    }

    /// Avanza al siguiente token y lo retorna.
    ///
    /// Al agotarse la secuencia retorna `None` y el cursor se queda
    /// en el último token.
    pub fn advance(&mut self) -> Option<&Located<Token>> {
        if !self.has_more() {
            return None;
        }

        let next = self.next_index();
        self.current = Some(next);
        self.tokens.get(next)
    }

    /// Observa el siguiente token sin consumirlo.
    pub fn peek(&self) -> Option<&Located<Token>> {
        self.tokens.get(self.next_index())
    }

    /// Token actual.
    pub fn current(&self) -> Option<&Located<Token>> {
        self.current.and_then(|index| self.tokens.get(index))
    }

    pub fn token_type(&self) -> Option<TokenType> {
        self.token().map(Token::token_type)
    }

    pub fn keyword(&self) -> Option<Keyword> {
        match self.token()? {
            Token::Keyword(keyword) => Some(*keyword),
            _ => None,
        }
    }

    pub fn symbol(&self) -> Option<Symbol> {
        match self.token()? {
            Token::Symbol(symbol) => Some(*symbol),
            _ => None,
        }
    }

    pub fn identifier(&self) -> Option<&Identifier> {
        match self.token()? {
            Token::Id(id) => Some(id),
            _ => None,
        }
    }

    pub fn int_value(&self) -> Option<u16> {
        match self.token()? {
            Token::IntConst(value) => Some(*value),
            _ => None,
        }
    }

    pub fn string_value(&self) -> Option<&str> {
        match self.token()? {
            Token::StringConst(string) => Some(string),
            _ => None,
        }
    }

    fn token(&self) -> Option<&Token> {
        self.current().map(Located::val)
    }

    fn next_index(&self) -> usize {
        self.current.map_or(0, |index| index + 1)
    }
}

/// Escribe un listado XML de tokens, una línea por token.
///
/// Este es el formato que consumen las herramientas de comparación
/// del curso; `<`, `>`, `&` y `"` se escapan como entidades.
pub fn write_xml<W: Write>(tokens: &[Located<Token>], output: &mut W) -> io::Result<()> {
    writeln!(output, "<tokens>")?;

    for token in tokens {
        let token = token.val();
        let lexeme = match token {
            Token::Keyword(keyword) => keyword.to_string(),
            Token::Symbol(symbol) => symbol.to_string(),
            Token::Id(id) => id.to_string(),
            Token::IntConst(integer) => integer.to_string(),
            Token::StringConst(string) => string.to_string(),
        };

        let tag = token.token_type().tag();
        writeln!(output, "<{0}> {1} </{0}>", tag, escape_xml(&lexeme))?;
    }

    writeln!(output, "</tokens>")
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }

    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source;

    fn lex(text: &str) -> Result<Vec<Token>, Vec<LexerError>> {
        let (start, stream) = source::consume(text.as_bytes(), "Test.jack");
        Lexer::new(start, stream)
            .try_exhaustive()
            .map(|tokens| tokens.into_iter().map(Located::into_inner).collect())
            .map_err(|errors| errors.into_iter().map(Located::into_inner).collect())
    }

    fn id(name: &str) -> Token {
        Token::Id(Identifier::new(name))
    }

    #[test]
    fn test_lexing() {
        let tokens = lex("let x = arr[3] + 17;").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Keyword(Keyword::Let),
                id("x"),
                Token::Symbol(Symbol::Equal),
                id("arr"),
                Token::Symbol(Symbol::OpenSquare),
                Token::IntConst(3),
                Token::Symbol(Symbol::CloseSquare),
                Token::Symbol(Symbol::Plus),
                Token::IntConst(17),
                Token::Symbol(Symbol::Semicolon),
            ]
        );
    }

    #[test]
    fn test_comments_are_stripped() {
        let plain = lex("class Main { function void main() { return; } }").unwrap();
        let commented = lex(
            "/** API doc\n * spanning lines */\nclass Main { // trailing\n\
             function /* inline */ void main() {\n return;/**/ } }\n// eof",
        )
        .unwrap();

        assert_eq!(plain, commented);
    }

    #[test]
    fn test_strings_keep_comment_markers() {
        let tokens = lex(r#"do Output.printString("a // b /* c */");"#).unwrap();
        assert_eq!(tokens[5], Token::StringConst(Rc::from("a // b /* c */")));
        assert_eq!(tokens.len(), 8);
    }

    #[test]
    fn test_division_is_not_a_comment() {
        let tokens = lex("a/b").unwrap();
        assert_eq!(tokens, vec![id("a"), Token::Symbol(Symbol::Slash), id("b")]);
    }

    #[test]
    fn test_identifiers() {
        let tokens = lex("_tmp x1 classy class").unwrap();
        assert_eq!(
            tokens,
            vec![id("_tmp"), id("x1"), id("classy"), Token::Keyword(Keyword::Class)]
        );
    }

    #[test]
    fn test_int_range() {
        assert_eq!(lex("32767").unwrap(), vec![Token::IntConst(32767)]);
        assert!(matches!(
            lex("32768").unwrap_err().as_slice(),
            [LexerError::IntOverflow]
        ));
    }

    #[test]
    fn test_unterminated() {
        assert!(matches!(
            lex("let s = \"open;\nlet t = 1;").unwrap_err().as_slice(),
            [LexerError::UnterminatedString]
        ));

        assert!(matches!(
            lex("class A { /* never closed\n}").unwrap_err().as_slice(),
            [LexerError::UnterminatedComment]
        ));
    }

    #[test]
    fn test_string_range() {
        assert_eq!(lex("\"\u{7FFF}\"").unwrap(), vec![Token::StringConst("\u{7FFF}".into())]);

        assert!(matches!(
            lex("\"a\u{9000}\"\n\"\u{1F600}\"").unwrap_err().as_slice(),
            [LexerError::BadChar('\u{9000}'), LexerError::BadChar('\u{1F600}')]
        ));

        let long = format!("\"{}\"", "a".repeat(INT_MAX as usize + 1));
        assert!(matches!(
            lex(&long).unwrap_err().as_slice(),
            [LexerError::StringOverflow]
        ));
    }

    #[test]
    fn test_multiple_errors() {
        let errors = lex("let a = $;\nlet b = 99999;\nlet c = 1;").unwrap_err();
        assert!(matches!(
            errors.as_slice(),
            [LexerError::BadChar('$'), LexerError::IntOverflow]
        ));
    }

    #[test]
    fn test_locations() {
        let (start, stream) = source::consume("class\n  Main".as_bytes(), "Loc.jack");
        let tokens = Lexer::new(start, stream).try_exhaustive().unwrap();

        assert_eq!(tokens[0].location().to_string(), "Loc.jack:[1:1-1:5]");
        assert_eq!(tokens[1].location().to_string(), "Loc.jack:[2:3-2:6]");
    }

    #[test]
    fn test_cursor() {
        let (start, stream) = source::consume("x 5 \"s\" ;".as_bytes(), "Cursor.jack");
        let mut cursor = Tokens::new(Lexer::new(start, stream).try_exhaustive().unwrap());

        assert!(cursor.current().is_none());
        assert!(cursor.has_more());

        cursor.advance();
        assert_eq!(cursor.token_type(), Some(TokenType::Identifier));
        assert_eq!(cursor.identifier().map(AsRef::as_ref), Some("x"));
        assert_eq!(cursor.int_value(), None);
        assert_eq!(cursor.peek().map(Located::val), Some(&Token::IntConst(5)));

        cursor.advance();
        assert_eq!(cursor.int_value(), Some(5));

        cursor.advance();
        assert_eq!(cursor.string_value(), Some("s"));

        cursor.advance();
        assert_eq!(cursor.symbol(), Some(Symbol::Semicolon));
        assert!(!cursor.has_more());
        assert!(cursor.advance().is_none());
        assert_eq!(cursor.symbol(), Some(Symbol::Semicolon));
    }

    #[test]
    fn test_xml_listing() {
        let (start, stream) = source::consume("if (a < \"&\")".as_bytes(), "Xml.jack");
        let tokens = Lexer::new(start, stream).try_exhaustive().unwrap();

        let mut output = Vec::new();
        write_xml(&tokens, &mut output).unwrap();

        assert_eq!(
            String::from_utf8(output).unwrap(),
            "<tokens>\n\
             <keyword> if </keyword>\n\
             <symbol> ( </symbol>\n\
             <identifier> a </identifier>\n\
             <symbol> &lt; </symbol>\n\
             <stringConstant> &amp; </stringConstant>\n\
             <symbol> ) </symbol>\n\
             </tokens>\n"
        );
    }
}
