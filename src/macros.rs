/// Emite una o más instrucciones a través del emisor de un parser.
///
/// Propaga errores de escritura con `?`.
macro_rules! emit {
    ($parser:expr, $($instruction:expr),+ $(,)?) => {{
        $($parser.output.emit($instruction)?;)+
    }};
}
