//! Tabla de símbolos.
//!
//! Cada clase se compila con dos ámbitos independientes: el ámbito de
//! clase, que contiene variables `static` y `field` y vive durante toda
//! la clase, y el ámbito de subrutina, que contiene argumentos y locales
//! y se reemplaza por uno vacío al iniciar cada subrutina. La búsqueda
//! consulta primero el ámbito de subrutina, de modo que sus nombres
//! ocultan a los de clase.

use std::{
    collections::HashMap,
    fmt::{self, Display},
};

use thiserror::Error;

use crate::{lex::Identifier, vm::Segment};

/// Categoría de almacenamiento de una variable declarada.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Static,
    Field,
    Argument,
    Local,
}

impl Kind {
    /// Segmento de la máquina virtual en el que reside la variable.
    pub fn segment(self) -> Segment {
        match self {
            Kind::Static => Segment::Static,
            Kind::Field => Segment::This,
            Kind::Argument => Segment::Argument,
            Kind::Local => Segment::Local,
        }
    }

    fn is_class_scope(self) -> bool {
        matches!(self, Kind::Static | Kind::Field)
    }
}

impl Display for Kind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = match self {
            Kind::Static => "static",
            Kind::Field => "field",
            Kind::Argument => "argument",
            Kind::Local => "local",
        };

        fmt.write_str(string)
    }
}

/// Tipo declarado de una variable.
///
/// El compilador no verifica tipos; solo necesita el nombre de la
/// clase para resolver llamadas a métodos sobre variables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type {
    Int,
    Char,
    Boolean,
    Class(Identifier),
}

impl Display for Type {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => fmt.write_str("int"),
            Type::Char => fmt.write_str("char"),
            Type::Boolean => fmt.write_str("boolean"),
            Type::Class(class) => class.fmt(fmt),
        }
    }
}

/// Entrada de la tabla.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub typ: Type,
    pub kind: Kind,
    pub index: u16,
}

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SymbolError {
    #[error("Symbol `{0}` is undefined")]
    Undefined(Identifier),

    #[error("Redefinition of `{0}` in the same scope")]
    Redefined(Identifier),
}

/// Un ámbito con sus propios contadores por categoría.
#[derive(Default)]
struct Scope {
    symbols: HashMap<Identifier, Entry>,
    counts: HashMap<Kind, u16>,
}

impl Scope {
    fn define(&mut self, name: Identifier, typ: Type, kind: Kind) -> Result<u16, SymbolError> {
        if self.symbols.contains_key(&name) {
            return Err(SymbolError::Redefined(name));
        }

        let count = self.counts.entry(kind).or_insert(0);
        let index = *count;
        *count += 1;

        self.symbols.insert(name, Entry { typ, kind, index });
        Ok(index)
    }

    fn count(&self, kind: Kind) -> u16 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }
}

#[derive(Default)]
pub struct SymbolTable {
    class: Scope,
    subroutine: Scope,
}

impl SymbolTable {
    pub fn new() -> Self {
        Default::default()
    }

    /// Descarta el ámbito de subrutina completo.
    pub fn start_subroutine(&mut self) {
        self.subroutine = Scope::default();
    }

    /// Declara un nombre y le asigna el siguiente índice libre de su
    /// categoría, el cual se retorna.
    ///
    /// Declarar dos veces un mismo nombre en un mismo ámbito es un error.
    /// Un argumento o local sí puede ocultar a una variable de clase.
    pub fn define(&mut self, name: Identifier, typ: Type, kind: Kind) -> Result<u16, SymbolError> {
        self.scope_mut(kind).define(name, typ, kind)
    }

    /// Cantidad de variables de una categoría en su ámbito.
    pub fn var_count(&self, kind: Kind) -> u16 {
        self.scope(kind).count(kind)
    }

    pub fn lookup(&self, name: &str) -> Option<&Entry> {
        self.subroutine
            .symbols
            .get(name)
            .or_else(|| self.class.symbols.get(name))
    }

    pub fn kind_of(&self, name: &str) -> Option<Kind> {
        self.lookup(name).map(|entry| entry.kind)
    }

    pub fn type_of(&self, name: &str) -> Option<&Type> {
        self.lookup(name).map(|entry| &entry.typ)
    }

    pub fn index_of(&self, name: &str) -> Option<u16> {
        self.lookup(name).map(|entry| entry.index)
    }

    fn scope(&self, kind: Kind) -> &Scope {
        if kind.is_class_scope() {
            &self.class
        } else {
            &self.subroutine
        }
    }

    fn scope_mut(&mut self, kind: Kind) -> &mut Scope {
        if kind.is_class_scope() {
            &mut self.class
        } else {
            &mut self.subroutine
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> Identifier {
        Identifier::new(name)
    }

    #[test]
    fn indices_are_dense_per_kind() {
        let mut table = SymbolTable::new();

        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            let index = table.define(id(name), Type::Int, Kind::Field).unwrap();
            assert_eq!(index as usize, i);
        }

        table.define(id("s"), Type::Boolean, Kind::Static).unwrap();
        table.define(id("x"), Type::Int, Kind::Local).unwrap();
        table.define(id("y"), Type::Char, Kind::Local).unwrap();

        assert_eq!(table.var_count(Kind::Field), 3);
        assert_eq!(table.var_count(Kind::Static), 1);
        assert_eq!(table.var_count(Kind::Local), 2);
        assert_eq!(table.var_count(Kind::Argument), 0);

        assert_eq!(table.index_of("c"), Some(2));
        assert_eq!(table.index_of("s"), Some(0));
        assert_eq!(table.index_of("y"), Some(1));
        assert_eq!(table.type_of("y"), Some(&Type::Char));
    }

    #[test]
    fn subroutine_scope_shadows_class_scope() {
        let mut table = SymbolTable::new();
        table.define(id("x"), Type::Int, Kind::Field).unwrap();
        assert_eq!(table.kind_of("x"), Some(Kind::Field));

        table.start_subroutine();
        table.define(id("x"), Type::Int, Kind::Local).unwrap();
        assert_eq!(table.kind_of("x"), Some(Kind::Local));
        assert_eq!(table.kind_of("x").map(Kind::segment), Some(Segment::Local));

        table.start_subroutine();
        assert_eq!(table.kind_of("x"), Some(Kind::Field));
        assert_eq!(table.kind_of("x").map(Kind::segment), Some(Segment::This));
    }

    #[test]
    fn start_subroutine_resets_counters() {
        let mut table = SymbolTable::new();
        table.define(id("f"), Type::Int, Kind::Field).unwrap();
        table.define(id("a"), Type::Int, Kind::Argument).unwrap();
        table.define(id("l"), Type::Int, Kind::Local).unwrap();

        table.start_subroutine();
        assert_eq!(table.var_count(Kind::Argument), 0);
        assert_eq!(table.var_count(Kind::Local), 0);
        assert_eq!(table.var_count(Kind::Field), 1);
        assert_eq!(table.lookup("a"), None);

        let index = table.define(id("b"), Type::Int, Kind::Argument).unwrap();
        assert_eq!(index, 0);
    }

    #[test]
    fn redefinition_is_rejected() {
        let mut table = SymbolTable::new();
        table.define(id("x"), Type::Int, Kind::Argument).unwrap();

        let error = table.define(id("x"), Type::Int, Kind::Local).unwrap_err();
        assert!(matches!(error, SymbolError::Redefined(name) if name.as_ref() == "x"));
        assert_eq!(table.var_count(Kind::Local), 0);
    }

    #[test]
    fn class_types_are_kept() {
        let mut table = SymbolTable::new();
        table
            .define(id("ball"), Type::Class(id("Ball")), Kind::Static)
            .unwrap();

        assert_eq!(table.type_of("ball").map(ToString::to_string).as_deref(), Some("Ball"));
        assert_eq!(table.lookup("nothing"), None);
    }
}
