//! Tabla de símbolos.
//!
//! Se implementa como un árbol AVL con llaves de texto. Tanto la tabla
//! global (funciones, getters, setters y variables `__globales`) como la
//! tabla de cada cuerpo de función utilizan esta misma estructura.
//!
//! Las funciones se registran bajo la llave `nombre_aridad`, lo cual
//! permite sobrecarga por número de parámetros. Los getters y setters
//! utilizan aridades 0 y 1 respectivamente.

use std::{
    cmp::Ordering,
    fmt::{self, Display},
};

/// Tipo estático de un valor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Type {
    Null,
    Num,
    String,
    Bool,

    /// Tipo que no se puede determinar en tiempo de compilación.
    Undefined,
}

impl Display for Type {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Null => "Null",
            Type::Num => "Num",
            Type::String => "String",
            Type::Bool => "Bool",
            Type::Undefined => "undefined",
        };

        fmt.write_str(name)
    }
}

/// Clase de invocable.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CallableKind {
    Function,
    Getter,
    Setter,
}

impl Display for CallableKind {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallableKind::Function => "function",
            CallableKind::Getter => "getter",
            CallableKind::Setter => "setter",
        };

        fmt.write_str(name)
    }
}

/// Registro de una función, getter o setter.
///
/// La aridad forma parte de la llave, por lo cual no se repite aquí.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Callable {
    kind: CallableKind,
}

impl Callable {
    pub fn new(kind: CallableKind) -> Self {
        Callable { kind }
    }

    pub fn kind(&self) -> CallableKind {
        self.kind
    }
}

/// Contenido de una entrada en la tabla.
///
/// Las variables no llevan información adicional: su tipo solo se conoce
/// en tiempo de ejecución.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Symbol {
    Variable,
    Callable(Callable),
}

impl Symbol {
    pub fn is_variable(&self) -> bool {
        matches!(self, Symbol::Variable)
    }

    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Symbol::Callable(callable) => Some(callable),
            Symbol::Variable => None,
        }
    }
}

/// Llave bajo la cual se registra un invocable.
pub fn callable_key(name: &str, arity: usize) -> String {
    format!("{}_{}", name, arity)
}

/// Llave bajo la cual se registra una variable global.
///
/// Ningún identificador contiene `@`, así que estas llaves nunca coinciden
/// con las de un invocable como `__0`, que corresponde a `_` con aridad 0.
pub fn global_key(name: &str) -> String {
    format!("@{}", name)
}

/// Nombre de la variable global registrada bajo una llave.
pub fn global_name(key: &str) -> Option<&str> {
    key.strip_prefix('@')
}

type Link = Option<Box<Node>>;

#[derive(Debug)]
struct Node {
    key: String,
    symbol: Symbol,
    height: u32,
    left: Link,
    right: Link,
}

/// Diccionario ordenado de símbolos, balanceado por altura.
#[derive(Debug, Default)]
pub struct SymbolTable {
    root: Link,
    len: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        Default::default()
    }

    /// Inserta o reemplaza un símbolo.
    ///
    /// Si la llave ya existía, retorna el registro anterior.
    pub fn insert<K: Into<String>>(&mut self, key: K, symbol: Symbol) -> Option<Symbol> {
        let mut replaced = None;
        insert(&mut self.root, key.into(), symbol, &mut replaced);

        if replaced.is_none() {
            self.len += 1;
        }

        replaced
    }

    /// Busca un símbolo por llave.
    pub fn find(&self, key: &str) -> Option<&Symbol> {
        let mut link = &self.root;
        while let Some(node) = link {
            link = match key.cmp(node.key.as_str()) {
                Ordering::Less => &node.left,
                Ordering::Greater => &node.right,
                Ordering::Equal => return Some(&node.symbol),
            };
        }

        None
    }

    pub fn contains(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    /// Elimina una llave, retornando su registro si existía.
    pub fn remove(&mut self, key: &str) -> Option<Symbol> {
        let mut removed = None;
        delete(&mut self.root, key, &mut removed);

        if removed.is_some() {
            self.len -= 1;
        }

        removed
    }

    /// Elimina una llave. Retorna `false` si no existía.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Altura del árbol; cero si está vacío.
    pub fn height(&self) -> u32 {
        height(&self.root)
    }

    /// Recorre las entradas en orden de llave.
    pub fn iter(&self) -> Iter<'_> {
        let mut iter = Iter { stack: Vec::new() };
        iter.descend(&self.root);
        iter
    }

    /// Libera todas las entradas.
    pub fn clear(&mut self) {
        self.root = None;
        self.len = 0;
    }
}

/// Recorrido en orden de una [`SymbolTable`].
pub struct Iter<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iter<'a> {
    fn descend(&mut self, mut link: &'a Link) {
        while let Some(node) = link {
            self.stack.push(node);
            link = &node.left;
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a Symbol);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.descend(&node.right);

        Some((&node.key, &node.symbol))
    }
}

fn height(link: &Link) -> u32 {
    link.as_ref().map_or(0, |node| node.height)
}

fn balance(node: &Node) -> i64 {
    height(&node.left) as i64 - height(&node.right) as i64
}

fn update(node: &mut Node) {
    node.height = 1 + height(&node.left).max(height(&node.right));
}

fn rotate_right(link: &mut Link) {
    if let Some(mut node) = link.take() {
        match node.left.take() {
            Some(mut pivot) => {
                node.left = pivot.right.take();
                update(&mut node);

                pivot.right = Some(node);
                update(&mut pivot);

                *link = Some(pivot);
            }

            None => *link = Some(node),
        }
    }
}

fn rotate_left(link: &mut Link) {
    if let Some(mut node) = link.take() {
        match node.right.take() {
            Some(mut pivot) => {
                node.right = pivot.left.take();
                update(&mut node);

                pivot.left = Some(node);
                update(&mut pivot);

                *link = Some(pivot);
            }

            None => *link = Some(node),
        }
    }
}

/// Restaura el invariante AVL en un nodo cuyos hijos ya están balanceados.
fn rebalance(link: &mut Link) {
    let node = match link {
        Some(node) => node,
        None => return,
    };

    update(node);
    let factor = balance(node);

    if factor > 1 {
        if node.left.as_deref().map_or(0, balance) < 0 {
            rotate_left(&mut node.left);
        }

        rotate_right(link);
    } else if factor < -1 {
        if node.right.as_deref().map_or(0, balance) > 0 {
            rotate_right(&mut node.right);
        }

        rotate_left(link);
    }
}

fn insert(link: &mut Link, key: String, symbol: Symbol, replaced: &mut Option<Symbol>) {
    let node = match link {
        Some(node) => node,
        None => {
            *link = Some(Box::new(Node {
                key,
                symbol,
                height: 1,
                left: None,
                right: None,
            }));

            return;
        }
    };

    match key.as_str().cmp(node.key.as_str()) {
        Ordering::Less => insert(&mut node.left, key, symbol, replaced),
        Ordering::Greater => insert(&mut node.right, key, symbol, replaced),
        Ordering::Equal => {
            *replaced = Some(std::mem::replace(&mut node.symbol, symbol));
            return;
        }
    }

    rebalance(link);
}

fn delete(link: &mut Link, key: &str, removed: &mut Option<Symbol>) {
    let node = match link {
        Some(node) => node,
        None => return,
    };

    match key.cmp(node.key.as_str()) {
        Ordering::Less => delete(&mut node.left, key, removed),
        Ordering::Greater => delete(&mut node.right, key, removed),
        Ordering::Equal => match (node.left.is_some(), node.right.is_some()) {
            (true, true) => {
                // Se sustituye por el predecesor en orden
                if let Some(predecessor) = detach_max(&mut node.left) {
                    let Node { key, symbol, .. } = *predecessor;
                    node.key = key;
                    *removed = Some(std::mem::replace(&mut node.symbol, symbol));
                }
            }

            _ => {
                if let Some(mut node) = link.take() {
                    *link = node.left.take().or_else(|| node.right.take());
                    *removed = Some(node.symbol);
                }

                return;
            }
        },
    }

    rebalance(link);
}

/// Desprende el nodo de mayor llave de un subárbol.
fn detach_max(link: &mut Link) -> Option<Box<Node>> {
    let has_right = link.as_ref()?.right.is_some();

    if has_right {
        let detached = link.as_mut().and_then(|node| detach_max(&mut node.right));
        rebalance(link);
        detached
    } else {
        let mut node = link.take()?;
        *link = node.left.take();
        Some(node)
    }
}
