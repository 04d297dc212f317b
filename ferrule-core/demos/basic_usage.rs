use ferrule_core::builder::{avg, count};
use ferrule_core::condition::{exists, group};
use ferrule_core::{
    col, DeleteBuilderInitial, Entity, EntityDescriptor, Field, InsertBuilder, KeyStrategy,
    LogicDelete, Predicate, QueryBuilder, SelectBuilder, Settings, UpdateBuilder, UpdateOptions,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Student {
    id: Option<i64>,
    full_name: String,
    age: Option<i32>,
    is_deleted: bool,
}

impl Student {
    const ID: Field<Student, Option<i64>> = Field::new("id");
    const FULL_NAME: Field<Student, String> = Field::new("full_name");
    const AGE: Field<Student, Option<i32>> = Field::new("age");
    const IS_DELETED: Field<Student, bool> = Field::new("is_deleted");
}

impl Entity for Student {
    fn descriptor() -> EntityDescriptor<Self> {
        EntityDescriptor::new()
            .id_with(Self::ID, KeyStrategy::Snowflake)
            .field(Self::FULL_NAME)
            .field(Self::AGE)
            .field(Self::IS_DELETED)
    }
}

fn main() -> ferrule_core::Result<()> {
    let settings = Settings::builder()
        .table_prefix("t_")
        .logic_delete(LogicDelete::enable("is_deleted", false, true))
        .build()?;

    // SELECT with a bracketed sub-expression
    let select = SelectBuilder::new()
        .select((Student::ID, Student::FULL_NAME))
        .from_entity::<Student>(&settings)
        .where_(
            Student::AGE
                .ge(18)
                .and(group(Student::FULL_NAME.like("A%").or(Student::FULL_NAME.like("B%")))),
        )
        .order_by_asc(Student::FULL_NAME)
        .limit_page(20, 2);
    println!("SELECT: {}", select.to_sql()?);
    println!("  params: {:?}", select.parameters());

    // Aggregates
    let stats = SelectBuilder::new()
        .select(("age", count(), avg("score")))
        .from("t_student")
        .where_(exists("select 1 from t_enrollment e where e.student_id = t_student.id"))
        .group_by("age")
        .having(count().gt(3));
    println!("STATS: {}", stats.to_sql()?);

    // INSERT with a generated key
    let student = Student {
        id: None,
        full_name: "Ada Lovelace".into(),
        age: Some(36),
        is_deleted: false,
    };
    let insert = InsertBuilder::for_entity(&settings, &student)?;
    println!("INSERT: {}", insert.to_sql()?);
    println!("  params: {:?}", insert.parameters());

    // Partial UPDATE
    let update = UpdateBuilder::for_entity(&settings, &student, UpdateOptions::ignore_nulls())?
        .where_(col("id").eq(insert.generated_keys()[0].clone()));
    println!("UPDATE: {}", update.to_sql()?);

    // Logical DELETE
    let delete = DeleteBuilderInitial::for_entity::<Student>(&settings)
        .where_(Student::AGE.lt(5).or(Student::IS_DELETED.eq(true)));
    println!("DELETE: {}", delete.to_sql()?);

    Ok(())
}
