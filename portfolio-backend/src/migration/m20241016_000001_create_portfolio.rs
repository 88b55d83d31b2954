use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Portfolio::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Portfolio::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Portfolio::FirstName).string_len(50).not_null())
                    .col(ColumnDef::new(Portfolio::LastName).string_len(50).not_null())
                    .col(ColumnDef::new(Portfolio::Email).string().not_null())
                    .col(ColumnDef::new(Portfolio::Phone).string().not_null())
                    .col(ColumnDef::new(Portfolio::ProfilePicture).string())
                    .col(ColumnDef::new(Portfolio::Bio).text().not_null())
                    .col(ColumnDef::new(Portfolio::Skills).string_len(250).not_null())
                    .col(ColumnDef::new(Portfolio::Linkedin).string())
                    .col(ColumnDef::new(Portfolio::Github).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx-portfolio-email")
                    .table(Portfolio::Table)
                    .col(Portfolio::Email)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Portfolio::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Portfolio {
    Table,
    Id,
    FirstName,
    LastName,
    Email,
    Phone,
    ProfilePicture,
    Bio,
    Skills,
    Linkedin,
    Github,
}
