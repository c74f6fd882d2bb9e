use std::fmt::Display;

/// Output format configuration
#[derive(Clone, Debug)]
pub struct OutputFormat {
    pub raw: bool,
}

impl OutputFormat {
    pub fn new(raw: bool) -> Self {
        Self { raw }
    }

    /// Print tabular data - either raw (tab-separated) or formatted (column-aligned)
    pub fn print_table<T>(&self, data: &[Vec<T>])
    where
        T: Display + AsRef<str>,
    {
        if data.is_empty() {
            return;
        }

        if self.raw {
            // Raw output: tab-separated values
            for row in data {
                let line = row
                    .iter()
                    .map(|cell| cell.as_ref())
                    .collect::<Vec<_>>()
                    .join("\t");
                println!("{line}");
            }
        } else {
            self.print_formatted_table(data);
        }
    }

    /// Print key-value pairs
    pub fn print_key_value<K, V>(&self, pairs: &[(K, V)])
    where
        K: Display + AsRef<str>,
        V: Display + AsRef<str>,
    {
        let data: Vec<Vec<String>> = pairs
            .iter()
            .map(|(k, v)| vec![k.to_string(), v.to_string()])
            .collect();

        self.print_table(&data);
    }

    fn print_formatted_table<T>(&self, data: &[Vec<T>])
    where
        T: Display + AsRef<str>,
    {
        // Calculate column widths
        let num_cols = data[0].len();
        let mut col_widths = vec![0; num_cols];

        for row in data {
            for (i, cell) in row.iter().enumerate() {
                col_widths[i] = col_widths[i].max(cell.as_ref().len());
            }
        }

        for row in data {
            let formatted_cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, cell)| {
                    if i == row.len() - 1 {
                        // Last column - no padding needed
                        cell.to_string()
                    } else {
                        format!("{:<width$}", cell.as_ref(), width = col_widths[i])
                    }
                })
                .collect();

            println!("{}", formatted_cells.join("  "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_output() {
        let format = OutputFormat::new(true);
        let data = vec![vec!["Serial", "3bfc2eb1"], vec!["Expires", "2027-08-23"]];

        // This would print:
        // Serial\t3bfc2eb1
        // Expires\t2027-08-23
        format.print_table(&data);
    }

    #[test]
    fn test_formatted_output() {
        let format = OutputFormat::new(false);
        let pairs = [("Serial", "3bfc2eb1"), ("Expires", "2027-08-23")];

        // This would print:
        // Serial   3bfc2eb1
        // Expires  2027-08-23
        format.print_key_value(&pairs);
    }
}
