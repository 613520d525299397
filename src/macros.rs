macro_rules! emit {
    ($writer:expr, $($format:tt)*) => {{
        let writer = &mut *$writer;
        writeln!(writer.output, $($format)*)?;
        writer.emitted += 1;
        Ok(())
    }};
}
