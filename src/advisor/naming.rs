use regex::Regex;
use sqlparser::ast::{
    AlterTableOperation, ColumnDef, ColumnOption, ObjectName, ObjectNamePart, Statement,
};
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::Token;

use crate::advisor::advice::{
    Advice, AdviceCode, AdviceStatus, Advisor, AdvisorContext, AdvisorError, NamingRulePayload,
};

/// Checks that auto-increment columns follow the configured naming
/// convention.
///
/// Walks `CREATE TABLE` column definitions and `ALTER TABLE`
/// ADD/MODIFY/CHANGE COLUMN operations; every auto-increment column whose
/// name fails the format regex or exceeds the maximum length produces one
/// advice entry per violated constraint.
pub struct NamingAutoIncrementColumnAdvisor;

impl Advisor for NamingAutoIncrementColumnAdvisor {
    fn check(&self, ctx: &AdvisorContext) -> Result<Vec<Advice>, AdvisorError> {
        let (format, max_length) = NamingRulePayload::from_rule(&ctx.rule)?;
        let mut checker = NamingChecker {
            status: ctx.rule.level.advice_status(),
            title: ctx.rule.rule_type.clone(),
            format,
            max_length,
            advice_list: Vec::new(),
        };

        for statement in &ctx.statements {
            checker.check_statement(statement);
        }

        if checker.advice_list.is_empty() {
            checker.advice_list.push(Advice {
                status: AdviceStatus::Success,
                code: AdviceCode::Ok,
                title: "OK".to_string(),
                content: String::new(),
                line: 0,
            });
        }
        Ok(checker.advice_list)
    }
}

struct NamingChecker {
    status: AdviceStatus,
    title: String,
    format: Regex,
    max_length: usize,
    advice_list: Vec<Advice>,
}

impl NamingChecker {
    fn check_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::CreateTable(create) => {
                let table = object_name_display(&create.name);
                for column in &create.columns {
                    if column_def_is_auto_increment(column) {
                        let line = column.name.span.start.line;
                        let name = column.name.value.clone();
                        self.check_column(&table, &name, line);
                    }
                }
            }
            Statement::AlterTable {
                name, operations, ..
            } => {
                let table = object_name_display(name);
                for operation in operations {
                    match operation {
                        AlterTableOperation::AddColumn { column_def, .. }
                            if column_def_is_auto_increment(column_def) =>
                        {
                            let line = column_def.name.span.start.line;
                            let name = column_def.name.value.clone();
                            self.check_column(&table, &name, line);
                        }
                        AlterTableOperation::ModifyColumn {
                            col_name, options, ..
                        } if options_are_auto_increment(options) => {
                            self.check_column(&table, &col_name.value, col_name.span.start.line);
                        }
                        AlterTableOperation::ChangeColumn {
                            new_name, options, ..
                        } if options_are_auto_increment(options) => {
                            self.check_column(&table, &new_name.value, new_name.span.start.line);
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    fn check_column(&mut self, table: &str, column: &str, line: u64) {
        if !self.format.is_match(column) {
            self.advice_list.push(Advice {
                status: self.status,
                code: AdviceCode::NamingAutoIncrementColumnConventionMismatch,
                title: self.title.clone(),
                content: format!(
                    "`{table}`.`{column}` mismatches auto_increment column naming convention, naming format should be \"{}\"",
                    self.format
                ),
                line,
            });
        }
        if self.max_length > 0 && column.len() > self.max_length {
            self.advice_list.push(Advice {
                status: self.status,
                code: AdviceCode::NamingAutoIncrementColumnConventionMismatch,
                title: self.title.clone(),
                content: format!(
                    "`{table}`.`{column}` mismatches auto_increment column naming convention, its length should be within {} characters",
                    self.max_length
                ),
                line,
            });
        }
    }
}

fn column_def_is_auto_increment(column: &ColumnDef) -> bool {
    column
        .options
        .iter()
        .any(|def| option_is_auto_increment(&def.option))
}

fn options_are_auto_increment(options: &[ColumnOption]) -> bool {
    options.iter().any(option_is_auto_increment)
}

fn option_is_auto_increment(option: &ColumnOption) -> bool {
    match option {
        ColumnOption::DialectSpecific(tokens) => tokens.iter().any(|token| {
            matches!(token, Token::Word(word)
                if word.keyword == Keyword::AUTO_INCREMENT
                    || word.value.eq_ignore_ascii_case("AUTO_INCREMENT"))
        }),
        _ => false,
    }
}

fn object_name_display(name: &ObjectName) -> String {
    name.0
        .iter()
        .filter_map(|part| match part {
            ObjectNamePart::Identifier(ident) => Some(ident.value.clone()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(".")
}
