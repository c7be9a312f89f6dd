use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Username).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::Email).string().not_null())
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(
                        ColumnDef::new(Users::IsSuperuser)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Users::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Users::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Users::UpdatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Users::LastLoginAt).timestamp())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserSessions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UserSessions::Token)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(UserSessions::UserId).integer().not_null())
                    .col(ColumnDef::new(UserSessions::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(UserSessions::ExpiresAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_sessions_user_id")
                            .from(UserSessions::Table, UserSessions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Groups::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Groups::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Groups::Name).string().not_null().unique_key())
                    .col(ColumnDef::new(Groups::Description).text())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GroupMembers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GroupMembers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GroupMembers::GroupId).integer().not_null())
                    .col(ColumnDef::new(GroupMembers::UserId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_members_group_id")
                            .from(GroupMembers::Table, GroupMembers::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_members_user_id")
                            .from(GroupMembers::Table, GroupMembers::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TopicCategories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TopicCategories::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(TopicCategories::Identifier)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(TopicCategories::Description).text().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Styles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Styles::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Styles::Name).string().not_null())
                    .col(ColumnDef::new(Styles::SldTitle).string())
                    .col(ColumnDef::new(Styles::SldBody).text())
                    .col(ColumnDef::new(Styles::SldVersion).string())
                    .col(ColumnDef::new(Styles::SldUrl).string())
                    .col(ColumnDef::new(Styles::Workspace).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Layers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Layers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Layers::Name).string().not_null())
                    .col(ColumnDef::new(Layers::Workspace).string().not_null())
                    .col(ColumnDef::new(Layers::Typename).string().not_null().unique_key())
                    .col(ColumnDef::new(Layers::Title).string().not_null())
                    .col(ColumnDef::new(Layers::AbstractText).text())
                    .col(ColumnDef::new(Layers::Storetype).string().not_null())
                    .col(
                        ColumnDef::new(Layers::Charset)
                            .string()
                            .not_null()
                            .default("UTF-8"),
                    )
                    .col(ColumnDef::new(Layers::OwnerId).integer().not_null())
                    .col(ColumnDef::new(Layers::CategoryId).integer())
                    .col(ColumnDef::new(Layers::DefaultStyleId).integer())
                    .col(ColumnDef::new(Layers::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Layers::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_layers_owner_id")
                            .from(Layers::Table, Layers::OwnerId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_layers_category_id")
                            .from(Layers::Table, Layers::CategoryId)
                            .to(TopicCategories::Table, TopicCategories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_layers_default_style_id")
                            .from(Layers::Table, Layers::DefaultStyleId)
                            .to(Styles::Table, Styles::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LayerStyles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LayerStyles::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LayerStyles::LayerId).integer().not_null())
                    .col(ColumnDef::new(LayerStyles::StyleId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_layer_styles_layer_id")
                            .from(LayerStyles::Table, LayerStyles::LayerId)
                            .to(Layers::Table, Layers::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_layer_styles_style_id")
                            .from(LayerStyles::Table, LayerStyles::StyleId)
                            .to(Styles::Table, Styles::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Attributes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Attributes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Attributes::LayerId).integer().not_null())
                    .col(ColumnDef::new(Attributes::Attribute).string().not_null())
                    .col(ColumnDef::new(Attributes::AttributeLabel).string())
                    .col(ColumnDef::new(Attributes::AttributeType).string().not_null())
                    .col(
                        ColumnDef::new(Attributes::Visible)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Attributes::DisplayOrder)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(Attributes::Count).integer().not_null().default(1))
                    .col(ColumnDef::new(Attributes::Min).string().not_null().default("NA"))
                    .col(ColumnDef::new(Attributes::Max).string().not_null().default("NA"))
                    .col(ColumnDef::new(Attributes::Average).string().not_null().default("NA"))
                    .col(ColumnDef::new(Attributes::Median).string().not_null().default("NA"))
                    .col(ColumnDef::new(Attributes::Stddev).string().not_null().default("NA"))
                    .col(ColumnDef::new(Attributes::Sum).string().not_null().default("NA"))
                    .col(
                        ColumnDef::new(Attributes::UniqueValues)
                            .text()
                            .not_null()
                            .default("NA"),
                    )
                    .col(ColumnDef::new(Attributes::LastStatsUpdated).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_attributes_layer_id")
                            .from(Attributes::Table, Attributes::LayerId)
                            .to(Layers::Table, Layers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LayerKeywords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LayerKeywords::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LayerKeywords::LayerId).integer().not_null())
                    .col(ColumnDef::new(LayerKeywords::Name).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_layer_keywords_layer_id")
                            .from(LayerKeywords::Table, LayerKeywords::LayerId)
                            .to(Layers::Table, Layers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ObjectPermissions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ObjectPermissions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ObjectPermissions::ResourceId).integer().not_null())
                    .col(ColumnDef::new(ObjectPermissions::UserId).integer())
                    .col(ColumnDef::new(ObjectPermissions::GroupId).integer())
                    .col(ColumnDef::new(ObjectPermissions::Permission).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_object_permissions_user_id")
                            .from(ObjectPermissions::Table, ObjectPermissions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_object_permissions_group_id")
                            .from(ObjectPermissions::Table, ObjectPermissions::GroupId)
                            .to(Groups::Table, Groups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_object_permissions_resource_id")
                    .table(ObjectPermissions::Table)
                    .col(ObjectPermissions::ResourceId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_layers_name")
                    .table(Layers::Table)
                    .col(Layers::Name)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Children before parents
        manager
            .drop_table(Table::drop().table(ObjectPermissions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LayerKeywords::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Attributes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LayerStyles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Layers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Styles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(TopicCategories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GroupMembers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Groups::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(UserSessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Username,
    Email,
    PasswordHash,
    IsSuperuser,
    IsActive,
    CreatedAt,
    UpdatedAt,
    LastLoginAt,
}

#[derive(Iden)]
enum UserSessions {
    Table,
    Id,
    Token,
    UserId,
    CreatedAt,
    ExpiresAt,
}

#[derive(Iden)]
enum Groups {
    Table,
    Id,
    Name,
    Description,
}

#[derive(Iden)]
enum GroupMembers {
    Table,
    Id,
    GroupId,
    UserId,
}

#[derive(Iden)]
enum TopicCategories {
    Table,
    Id,
    Identifier,
    Description,
}

#[derive(Iden)]
enum Styles {
    Table,
    Id,
    Name,
    SldTitle,
    SldBody,
    SldVersion,
    SldUrl,
    Workspace,
}

#[derive(Iden)]
enum Layers {
    Table,
    Id,
    Name,
    Workspace,
    Typename,
    Title,
    AbstractText,
    Storetype,
    Charset,
    OwnerId,
    CategoryId,
    DefaultStyleId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum LayerStyles {
    Table,
    Id,
    LayerId,
    StyleId,
}

#[derive(Iden)]
enum Attributes {
    Table,
    Id,
    LayerId,
    Attribute,
    AttributeLabel,
    AttributeType,
    Visible,
    DisplayOrder,
    Count,
    Min,
    Max,
    Average,
    Median,
    Stddev,
    Sum,
    UniqueValues,
    LastStatsUpdated,
}

#[derive(Iden)]
enum LayerKeywords {
    Table,
    Id,
    LayerId,
    Name,
}

#[derive(Iden)]
enum ObjectPermissions {
    Table,
    Id,
    ResourceId,
    UserId,
    GroupId,
    Permission,
}
