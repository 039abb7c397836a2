/// Advice records, rule descriptors, and the advisor contract.
pub mod advice;
/// Auto-increment column naming checks for MySQL DDL.
pub mod naming;

pub use advice::{
    parse_mysql_ddl, Advice, AdviceCode, AdviceStatus, Advisor, AdvisorContext, AdvisorError,
    NamingRulePayload, Rule, RuleLevel,
};
pub use naming::NamingAutoIncrementColumnAdvisor;
